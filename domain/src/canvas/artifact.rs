//! Canvas artifact entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Pending,
    Partial,
    Complete,
    Error,
    Timeout,
}

impl ArtifactStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ArtifactStatus::Complete | ArtifactStatus::Error | ArtifactStatus::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Partial => "partial",
            ArtifactStatus::Complete => "complete",
            ArtifactStatus::Error => "error",
            ArtifactStatus::Timeout => "timeout",
        }
    }

    /// Parse the `status` field of a tool result payload
    pub fn parse(status: &str) -> Option<Self> {
        match status.to_lowercase().as_str() {
            "pending" | "started" | "running" => Some(ArtifactStatus::Pending),
            "partial" | "streaming" => Some(ArtifactStatus::Partial),
            "complete" | "completed" | "success" | "done" => Some(ArtifactStatus::Complete),
            "error" | "failed" => Some(ArtifactStatus::Error),
            "timeout" => Some(ArtifactStatus::Timeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A visual object tracked by id (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasArtifact {
    pub id: String,
    /// Producing tool name (e.g. "create_bar_chart")
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: ArtifactStatus,
    #[serde(default)]
    pub payload: Value,
    /// Id of the tool call that produced the artifact
    pub tool_call_id: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Set once the soft warning threshold has been crossed
    #[serde(default)]
    pub slow: bool,
}
