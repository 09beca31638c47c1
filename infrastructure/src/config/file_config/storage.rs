//! Storage locations from TOML (`[storage]`, `[workflows]`, `[logging]`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "chatflow";

/// Conversation storage.
///
/// ```toml
/// [storage]
/// dir = "~/.local/share/chatflow/threads"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding one JSONL file per thread. Unset uses the
    /// platform data directory.
    pub dir: Option<PathBuf>,
}

impl FileStorageConfig {
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| expand_home(d))
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_DIR).join("threads")))
    }
}

/// Stored workflow definitions.
///
/// ```toml
/// [workflows]
/// dir = "./workflows"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkflowsConfig {
    pub enabled: bool,
    /// Directory of `*.json` / `*.toml` workflow definitions. Unset uses
    /// `<config dir>/chatflow/workflows`.
    pub dir: Option<PathBuf>,
}

impl Default for FileWorkflowsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl FileWorkflowsConfig {
    pub fn resolve_dir(&self) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| expand_home(d))
            .or_else(|| dirs::config_dir().map(|d| d.join(APP_DIR).join("workflows")))
    }
}

/// Trace output.
///
/// ```toml
/// [logging]
/// trace_file = "~/.local/share/chatflow/trace.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving turn trace events. Unset disables tracing.
    pub trace_file: Option<PathBuf>,
}

impl FileLoggingConfig {
    pub fn resolve_trace_file(&self) -> Option<PathBuf> {
        self.trace_file.as_ref().map(|p| expand_home(p))
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
