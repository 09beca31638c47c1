//! Tool source errors
//!
//! A tool source (external provider pool, workflow store, default toolkits)
//! can fail to resolve independently of the others. The registry assembler
//! degrades a failed source to an empty set, so these errors are mostly
//! logged rather than surfaced.

use thiserror::Error;

use super::entities::ToolSourceKind;

/// Error type for tool source resolution
#[derive(Debug, Error)]
pub enum ToolSourceError {
    /// Source is not available (e.g., provider process failed to start)
    #[error("{kind} source not available: {message}")]
    Unavailable {
        kind: ToolSourceKind,
        message: String,
    },

    /// Listing tools from the source failed
    #[error("{kind} source discovery failed: {message}")]
    DiscoveryFailed {
        kind: ToolSourceKind,
        message: String,
    },

    /// Source configuration or stored definition is invalid
    #[error("{kind} source misconfigured: {message}")]
    Configuration {
        kind: ToolSourceKind,
        message: String,
    },
}

impl ToolSourceError {
    pub fn unavailable(kind: ToolSourceKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            message: message.into(),
        }
    }

    pub fn discovery_failed(kind: ToolSourceKind, message: impl Into<String>) -> Self {
        Self::DiscoveryFailed {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(kind: ToolSourceKind, message: impl Into<String>) -> Self {
        Self::Configuration {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ToolSourceKind {
        match self {
            Self::Unavailable { kind, .. }
            | Self::DiscoveryFailed { kind, .. }
            | Self::Configuration { kind, .. } => *kind,
        }
    }
}
