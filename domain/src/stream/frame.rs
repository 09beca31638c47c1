//! Response frame types.
//!
//! Frames serialize as one JSON object each, tagged by `type`:
//!
//! ```text
//! start → (text-delta | tool-call | tool-progress | tool-result)* → finish
//!                                                              └─→ error
//! ```
//!
//! `tool-result` frames are emitted by the capture layer for every call,
//! whether the tool succeeded, failed or timed out. They are the single
//! source of truth for downstream artifact materialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::conversation::metadata::ChatMetadata;
use crate::execution::value_objects::{FinishReason, Usage};
use crate::tool::entities::ToolCall;
use crate::tool::progress::ToolProgress;
use crate::tool::value_objects::{ToolOutcome, ToolResultRecord};

/// An event in the streamed chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StreamFrame {
    /// First frame of a turn: ids of the messages being produced
    Start {
        thread_id: String,
        message_id: String,
    },
    /// A text chunk from the model
    TextDelta { delta: String },
    /// The model requested a tool call
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    /// Intermediate progress of a running tool
    ToolProgress(ToolProgress),
    /// Terminal result of a tool call (success, error or timeout)
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: Value,
        #[serde(default)]
        is_error: bool,
        timestamp: DateTime<Utc>,
    },
    /// End of the turn
    Finish {
        finish_reason: FinishReason,
        usage: Usage,
        metadata: ChatMetadata,
    },
    /// The turn failed. No finish frame follows.
    Error { message: String, recoverable: bool },
}

impl StreamFrame {
    pub fn text_delta(delta: impl Into<String>) -> Self {
        StreamFrame::TextDelta {
            delta: delta.into(),
        }
    }

    pub fn tool_call(call: &ToolCall) -> Self {
        StreamFrame::ToolCall {
            tool_call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            input: call.input.clone(),
        }
    }

    /// Build a timestamped result frame from a captured result.
    ///
    /// Successful results carry the tool output unchanged; errors and
    /// timeouts carry `{"error": {...}}` with `is_error` set.
    pub fn tool_result(record: &ToolResultRecord) -> Self {
        let (result, is_error) = match &record.outcome {
            ToolOutcome::Success { output } => (output.clone(), false),
            ToolOutcome::Error { error } => (json!({ "error": error }), true),
            ToolOutcome::Timeout { after_ms } => (
                json!({
                    "error": {
                        "code": crate::tool::value_objects::ToolError::TIMEOUT,
                        "message": format!("Tool did not respond within {} ms", after_ms),
                    },
                    "status": "timeout",
                }),
                true,
            ),
        };
        StreamFrame::ToolResult {
            tool_call_id: record.call_id.clone(),
            tool_name: record.tool_name.clone(),
            result,
            is_error,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>, recoverable: bool) -> Self {
        StreamFrame::Error {
            message: message.into(),
            recoverable,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StreamFrame::Start { .. } => "start",
            StreamFrame::TextDelta { .. } => "text-delta",
            StreamFrame::ToolCall { .. } => "tool-call",
            StreamFrame::ToolProgress(_) => "tool-progress",
            StreamFrame::ToolResult { .. } => "tool-result",
            StreamFrame::Finish { .. } => "finish",
            StreamFrame::Error { .. } => "error",
        }
    }

    /// Returns true if this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamFrame::Finish { .. } | StreamFrame::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::value_objects::ToolChoiceMode;
    use crate::tool::value_objects::ToolError;

    #[test]
    fn test_tool_result_frame_shape() {
        let record = ToolResultRecord::success(
            "call_1",
            "create_bar_chart",
            json!({"status": "complete", "id": "X", "title": "Sales", "payload": {}}),
        );
        let value = serde_json::to_value(StreamFrame::tool_result(&record)).unwrap();

        assert_eq!(value["type"], "tool-result");
        assert_eq!(value["toolCallId"], "call_1");
        assert_eq!(value["toolName"], "create_bar_chart");
        assert_eq!(value["result"]["id"], "X");
        assert_eq!(value["isError"], false);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_error_and_timeout_results_are_flagged() {
        let failed = ToolResultRecord::failure("c", "t", ToolError::execution_failed("boom"));
        match StreamFrame::tool_result(&failed) {
            StreamFrame::ToolResult { is_error, result, .. } => {
                assert!(is_error);
                assert_eq!(result["error"]["code"], "EXECUTION_FAILED");
            }
            other => panic!("unexpected frame {:?}", other),
        }

        let timed_out = ToolResultRecord::timeout("c", "t", 100);
        match StreamFrame::tool_result(&timed_out) {
            StreamFrame::ToolResult { result, .. } => assert_eq!(result["status"], "timeout"),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_finish_frame_round_trip() {
        let frame = StreamFrame::Finish {
            finish_reason: FinishReason::StepLimit,
            usage: Usage::new(1, 2),
            metadata: ChatMetadata::new(ToolChoiceMode::Auto, 3),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"finishReason\":\"step-limit\""));
        let back: StreamFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
        assert!(back.is_terminal());
    }

    #[test]
    fn test_text_delta_type_name() {
        let frame = StreamFrame::text_delta("hi");
        assert_eq!(frame.type_name(), "text-delta");
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "text-delta", "delta": "hi"})
        );
    }
}
