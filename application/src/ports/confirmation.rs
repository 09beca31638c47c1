//! Confirmation port for manual tool choice.
//!
//! In manual mode a turn ends with tool calls awaiting confirmation. Before
//! the next turn the host asks the user about each one and records the
//! decision on the stored message.
//!
//! # Flow
//!
//! ```text
//! Turn N (manual): model proposes tool call → part stored awaiting-confirmation
//!        ↓
//! ConfirmationPort::confirm() → user approves / rejects
//!        ↓
//! decision recorded on the part ({"approved": bool})
//!        ↓
//! Turn N+1: gateway executes approved calls, substitutes rejection text otherwise
//! ```
//!
//! # Built-in Implementations
//!
//! - [`AutoRejectConfirmation`] - Always rejects
//! - [`AutoApproveConfirmation`] - Always approves
//!
//! For interactive use, see `InteractiveConfirmation` in the presentation layer.

use async_trait::async_trait;
use chatflow_domain::{ToolCall, ToolDefinition};
use thiserror::Error;

/// Error type for confirmation operations.
///
/// These errors represent failures while asking, not decisions made by
/// the user.
#[derive(Error, Debug, Clone)]
pub enum ConfirmationError {
    /// User cancelled the operation (e.g., via Ctrl+C).
    #[error("Operation cancelled")]
    Cancelled,
    /// Input/output error (e.g., terminal read failure).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Port for asking the user whether a proposed tool call may run.
#[async_trait]
pub trait ConfirmationPort: Send + Sync {
    /// Returns `Ok(true)` to approve, `Ok(false)` to reject.
    async fn confirm(
        &self,
        call: &ToolCall,
        definition: Option<&ToolDefinition>,
    ) -> Result<bool, ConfirmationError>;
}

/// Rejects every call. The safest non-interactive mode.
pub struct AutoRejectConfirmation;

#[async_trait]
impl ConfirmationPort for AutoRejectConfirmation {
    async fn confirm(
        &self,
        _call: &ToolCall,
        _definition: Option<&ToolDefinition>,
    ) -> Result<bool, ConfirmationError> {
        Ok(false)
    }
}

/// Approves every call.
pub struct AutoApproveConfirmation;

#[async_trait]
impl ConfirmationPort for AutoApproveConfirmation {
    async fn confirm(
        &self,
        _call: &ToolCall,
        _definition: Option<&ToolDefinition>,
    ) -> Result<bool, ConfirmationError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_implementations() {
        let call = ToolCall::new("c1", "http_fetch");
        assert!(!AutoRejectConfirmation.confirm(&call, None).await.unwrap());
        assert!(AutoApproveConfirmation.confirm(&call, None).await.unwrap());
    }
}
