//! Error types for the external provider adapter

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur when talking to a tool provider process
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Failed to spawn provider process: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("JSON-RPC error (code {code}): {message}")]
    RpcError { code: i64, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl McpError {
    /// Whether the provider process is gone and the client must be rebuilt
    pub fn is_fatal(&self) -> bool {
        matches!(self, McpError::TransportClosed | McpError::SpawnError(_))
    }
}
