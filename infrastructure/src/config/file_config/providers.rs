//! External tool provider configuration from TOML (`[[providers.servers]]`)

use chatflow_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Raw provider configuration from TOML
///
/// # Example
///
/// ```toml
/// [[providers.servers]]
/// id = "github"
/// name = "GitHub"
/// command = "npx"
/// args = ["-y", "@modelcontextprotocol/server-github"]
/// env = { GITHUB_TOKEN = "..." }
///
/// [[providers.servers]]
/// id = "sqlite"
/// command = "uvx"
/// args = ["mcp-server-sqlite", "--db-path", "data.db"]
/// enabled = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvidersConfig {
    pub servers: Vec<FileProviderServerConfig>,
}

/// One provider process speaking the list-tools / call-tool protocol over stdio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProviderServerConfig {
    /// Stable id referenced by permission sets and mentions
    pub id: String,
    /// Display name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound for a single request to the provider
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl FileProviderServerConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl FileProvidersConfig {
    pub fn enabled_servers(&self) -> impl Iterator<Item = &FileProviderServerConfig> {
        self.servers.iter().filter(|s| s.enabled)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, server) in self.servers.iter().enumerate() {
            if server.id.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::MissingValue {
                        field: format!("providers.servers[{}].id", index),
                    },
                    format!("providers.servers[{}]: id cannot be empty", index),
                ));
                continue;
            }
            if !seen.insert(server.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateId {
                        section: "providers.servers".to_string(),
                        id: server.id.clone(),
                    },
                    format!("providers.servers: duplicate id '{}'", server.id),
                ));
            }
            if server.command.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::MissingValue {
                        field: format!("providers.servers[{}].command", index),
                    },
                    format!("provider '{}': command cannot be empty", server.id),
                ));
            }
        }
        issues
    }
}
