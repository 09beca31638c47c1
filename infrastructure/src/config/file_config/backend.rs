//! Model backend configuration from TOML (`[backend]` section)

use chatflow_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw backend configuration from TOML
///
/// # Example
///
/// ```toml
/// [backend]
/// base_url = "https://api.openai.com/v1"   # any OpenAI-compatible endpoint
/// api_key_env = "OPENAI_API_KEY"           # name of the env var holding the key
/// model = "gpt-4o-mini"
/// request_timeout_secs = 120
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub base_url: String,
    /// Environment variable the API key is read from. The key itself is
    /// never stored in the config file.
    pub api_key_env: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl FileBackendConfig {
    /// Read the API key from the configured environment variable.
    ///
    /// Local OpenAI-compatible servers often need no key, so a missing
    /// variable is not an error.
    pub fn api_key(&self) -> Option<String> {
        if self.api_key_env.trim().is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingValue {
                    field: "backend.base_url".to_string(),
                },
                "backend.base_url cannot be empty",
            ));
        } else if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidEnumValue {
                    field: "backend.base_url".to_string(),
                    value: self.base_url.clone(),
                    valid_values: vec!["http://...".to_string(), "https://...".to_string()],
                },
                format!(
                    "backend.base_url: '{}' is not an http(s) URL",
                    self.base_url
                ),
            ));
        }

        if self.model.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingValue {
                    field: "backend.model".to_string(),
                },
                "backend.model cannot be empty",
            ));
        }

        if self.request_timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "backend.request_timeout_secs".to_string(),
                },
                "backend.request_timeout_secs is 0, using 1",
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FileBackendConfig::default().validate().is_empty());
    }

    #[test]
    fn test_non_http_url_is_error() {
        let config = FileBackendConfig {
            base_url: "localhost:8080".to_string(),
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_empty_key_env_means_no_key() {
        let config = FileBackendConfig {
            api_key_env: String::new(),
            ..Default::default()
        };
        assert!(config.api_key().is_none());
    }
}
