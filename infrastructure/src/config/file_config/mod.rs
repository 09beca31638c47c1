//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod backend;
mod canvas;
mod chat;
mod output;
mod providers;
mod storage;

pub use backend::FileBackendConfig;
pub use canvas::FileCanvasConfig;
pub use chat::FileChatConfig;
pub use output::FileOutputConfig;
pub use providers::{FileProviderServerConfig, FileProvidersConfig};
pub use storage::{FileLoggingConfig, FileStorageConfig, FileWorkflowsConfig};

use chatflow_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration that cannot be used at all
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// OpenAI-compatible model backend
    pub backend: FileBackendConfig,
    /// Turn loop settings
    pub chat: FileChatConfig,
    /// External tool providers
    pub providers: FileProvidersConfig,
    /// Stored workflow definitions
    pub workflows: FileWorkflowsConfig,
    /// Artifact materializer timing
    pub canvas: FileCanvasConfig,
    /// Conversation storage
    pub storage: FileStorageConfig,
    /// Trace output
    pub logging: FileLoggingConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. Sections
    /// validate themselves; values that fall back to a default produce
    /// warnings, values that cannot work produce errors.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.backend.validate());
        issues.extend(self.chat.validate());
        issues.extend(self.providers.validate());
        issues.extend(self.canvas.validate());
        issues
    }

    /// Fail on error-level issues, handing back the warnings otherwise.
    pub fn ensure_valid(&self) -> Result<Vec<ConfigIssue>, ConfigValidationError> {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            self.validate().into_iter().partition(|i| i.is_error());
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(ConfigValidationError::Invalid(
                errors.into_iter().map(|i| i.message).collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{OutputFormat, ToolChoiceMode};

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[backend]
base_url = "http://localhost:11434/v1"
model = "llama3.1"

[chat]
max_steps = 6
tool_choice = "manual"

[[providers.servers]]
id = "github"
command = "npx"
args = ["-y", "server-github"]

[workflows]
dir = "./workflows"

[canvas]
hard_timeout_secs = 45

[storage]
dir = "/var/lib/chatflow"

[logging]
trace_file = "trace.jsonl"

[output]
format = "json"
color = false
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend.model, "llama3.1");
        assert_eq!(config.backend.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.chat.max_steps, 6);
        assert_eq!(config.chat.parse_tool_choice().0, ToolChoiceMode::Manual);
        assert_eq!(config.providers.servers[0].id, "github");
        assert!(config.workflows.enabled);
        assert_eq!(config.canvas.hard_timeout_secs, 45);
        assert_eq!(config.canvas.soft_timeout_secs, 15);
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert!(!config.output.color);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[chat]
strict_assembly = true
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.chat.strict_assembly);
        // Defaults should apply
        assert_eq!(config.chat.max_steps, 10);
        assert_eq!(config.chat.tool_timeout_secs, 60);
        assert!(config.providers.servers.is_empty());
        assert!(config.output.show_progress);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert!(config.ensure_valid().unwrap().is_empty());
    }

    #[test]
    fn test_ensure_valid_collects_errors() {
        let mut config = FileConfig::default();
        config.backend.model = String::new();
        config.chat.tool_timeout_secs = 0;
        config.chat.tool_choice = "maybe".to_string();

        let err = config.ensure_valid().unwrap_err();
        let ConfigValidationError::Invalid(messages) = err;
        assert_eq!(messages.len(), 2);
    }
}
