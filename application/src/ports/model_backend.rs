//! Model backend port
//!
//! Defines the interface for streaming one step of a tool-calling model.
//! The backend is a black box: given a transcript and tool definitions it
//! streams text deltas, tool calls and a finish event.

use async_trait::async_trait;
use chatflow_domain::{FinishReason, ToolCall, ToolChoiceMode, ToolDefinition, Usage};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Stream closed")]
    StreamClosed,
}

impl BackendError {
    /// Whether retrying the same request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Connection(_) | BackendError::Timeout | BackendError::StreamClosed
        )
    }
}

/// One message of the model-facing transcript
#[derive(Debug, Clone, PartialEq)]
pub enum ModelMessage {
    System(String),
    User(String),
    Assistant {
        text: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Result of a tool call, rendered as text for the model
    ToolResult {
        call_id: String,
        tool_name: String,
        content: String,
    },
}

/// Request for a single step
#[derive(Debug, Clone)]
pub struct StepRequest {
    /// Model selector; `None` uses the backend default
    pub model: Option<String>,
    pub messages: Vec<ModelMessage>,
    /// Tool definitions offered to the model (schema only)
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoiceMode,
}

/// An event in a streaming step.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// A text chunk from the model.
    TextDelta(String),
    /// A fully assembled tool call.
    ToolCall {
        call: ToolCall,
        /// Transport-only data (e.g. provider indices); never persisted
        provider_metadata: Option<Value>,
    },
    /// End of the step.
    Finish {
        finish_reason: FinishReason,
        usage: Usage,
    },
    /// An error that occurred during streaming.
    Error(String),
}

/// Handle for receiving the events of one step.
///
/// Wraps an `mpsc::Receiver<BackendEvent>`.
pub struct StepStream {
    pub receiver: mpsc::Receiver<BackendEvent>,
}

impl StepStream {
    pub fn new(receiver: mpsc::Receiver<BackendEvent>) -> Self {
        Self { receiver }
    }

    /// Build a stream that replays a fixed list of events
    pub fn from_events(events: Vec<BackendEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event
            let _ = tx.try_send(event);
        }
        Self::new(rx)
    }
}

/// Port for the model backend
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend identifier for logs and metadata
    fn name(&self) -> &str;

    /// Default model used when a request does not select one
    fn default_model(&self) -> &str;

    /// Start streaming one step.
    ///
    /// The backend should stop producing events once `cancellation` fires.
    async fn stream_step(
        &self,
        request: StepRequest,
        cancellation: CancellationToken,
    ) -> Result<StepStream, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_events_replays_in_order() {
        let mut stream = StepStream::from_events(vec![
            BackendEvent::TextDelta("a".into()),
            BackendEvent::Finish {
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            },
        ]);
        assert_eq!(
            stream.receiver.recv().await,
            Some(BackendEvent::TextDelta("a".into()))
        );
        assert!(matches!(
            stream.receiver.recv().await,
            Some(BackendEvent::Finish { .. })
        ));
        assert_eq!(stream.receiver.recv().await, None);
    }

    #[test]
    fn test_transient_errors() {
        assert!(BackendError::Timeout.is_transient());
        assert!(!BackendError::Authentication("bad key".into()).is_transient());
    }
}
