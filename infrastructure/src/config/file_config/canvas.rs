//! Canvas materializer timing from TOML (`[canvas]` section)

use chatflow_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw canvas configuration from TOML
///
/// # Example
///
/// ```toml
/// [canvas]
/// soft_timeout_secs = 15    # flag an artifact as slow
/// hard_timeout_secs = 30    # force it to `timeout`
/// debounce_ms = 150         # coalesce bursts before re-rendering
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCanvasConfig {
    pub soft_timeout_secs: u64,
    pub hard_timeout_secs: u64,
    pub debounce_ms: u64,
}

impl Default for FileCanvasConfig {
    fn default() -> Self {
        Self {
            soft_timeout_secs: 15,
            hard_timeout_secs: 30,
            debounce_ms: 150,
        }
    }
}

impl FileCanvasConfig {
    pub fn soft_timeout(&self) -> Duration {
        Duration::from_secs(self.soft_timeout_secs)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_secs(self.hard_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.hard_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "canvas.hard_timeout_secs".to_string(),
                },
                "canvas.hard_timeout_secs cannot be 0",
            ));
        } else if self.soft_timeout_secs >= self.hard_timeout_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "canvas.soft_timeout_secs".to_string(),
                },
                format!(
                    "canvas.soft_timeout_secs ({}) should be below hard_timeout_secs ({}); \
                     no slow warning will be shown",
                    self.soft_timeout_secs, self.hard_timeout_secs
                ),
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FileCanvasConfig::default();
        assert_eq!(config.soft_timeout(), Duration::from_secs(15));
        assert_eq!(config.hard_timeout(), Duration::from_secs(30));
        assert_eq!(config.debounce(), Duration::from_millis(150));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_soft_above_hard_warns() {
        let config = FileCanvasConfig {
            soft_timeout_secs: 40,
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }
}
