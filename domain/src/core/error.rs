//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid tool choice mode: {0}")]
    InvalidToolChoice(String),

    #[error("Unknown toolkit: {0}")]
    UnknownToolkit(String),

    #[error("Invalid mention: {0}")]
    InvalidMention(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error_display() {
        let error = DomainError::Cancelled;
        assert_eq!(error.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_is_cancelled_check() {
        assert!(DomainError::Cancelled.is_cancelled());
        assert!(!DomainError::UnknownToolkit("x".to_string()).is_cancelled());
        assert!(!DomainError::InvalidMessage("empty".to_string()).is_cancelled());
    }
}
