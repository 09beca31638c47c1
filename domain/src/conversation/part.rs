//! Message parts
//!
//! A message is an ordered list of tagged parts:
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `text` | A text segment in emission order |
//! | `tool-call` | One tool call with its result merged in |
//! | `tool-result` | A result whose call is unknown (kept, never dropped) |

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tool::entities::ToolCall;
use crate::tool::value_objects::{ToolError, ToolOutcome, ToolResultRecord};

/// Output written in place of a rejected tool's result.
pub const REJECTION_MESSAGE: &str = "The user rejected this tool call. It was not executed.";

/// Lifecycle state of a persisted tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolPartState {
    /// Call recorded, result not yet available
    InputAvailable,
    /// Manual mode: waiting for the user to confirm or reject
    AwaitingConfirmation,
    OutputAvailable,
    OutputError,
    /// Tool gave up after its time budget
    OutputTimeout,
    /// The turn ended before the call resolved
    Aborted,
}

impl ToolPartState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ToolPartState::OutputAvailable
                | ToolPartState::OutputError
                | ToolPartState::OutputTimeout
                | ToolPartState::Aborted
        )
    }
}

/// A tool call persisted together with its (possibly pending) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationPart {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
    pub state: ToolPartState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Transport-only metadata from the backend; stripped before persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<Value>,
}

impl ToolInvocationPart {
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            tool_call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            input: call.input.clone(),
            state: ToolPartState::InputAvailable,
            output: None,
            error: None,
            provider_metadata: None,
        }
    }

    /// Merge a result into this part (call → output-available / error / timeout)
    pub fn apply_result(&mut self, result: &ToolResultRecord) {
        match &result.outcome {
            ToolOutcome::Success { output } => {
                self.state = ToolPartState::OutputAvailable;
                self.output = Some(output.clone());
                self.error = None;
            }
            ToolOutcome::Error { error } => {
                self.state = ToolPartState::OutputError;
                self.output = None;
                self.error = Some(error.clone());
            }
            ToolOutcome::Timeout { after_ms } => {
                self.state = ToolPartState::OutputTimeout;
                self.output = None;
                self.error = Some(ToolError::timeout(format!(
                    "{} after {} ms",
                    self.tool_name, after_ms
                )));
            }
        }
    }

    pub fn to_call(&self) -> ToolCall {
        ToolCall::new(&self.tool_call_id, &self.tool_name).with_input(self.input.clone())
    }

    /// Read the user's decision from a part awaiting confirmation.
    ///
    /// The decision is stored in `output` as `{"approved": bool}`. `None`
    /// means no decision has been recorded yet.
    pub fn confirmation_decision(&self) -> Option<bool> {
        if self.state != ToolPartState::AwaitingConfirmation {
            return None;
        }
        self.output
            .as_ref()
            .and_then(|o| o.get("approved"))
            .and_then(|v| v.as_bool())
    }

    /// Record the user's decision on a pending part
    pub fn record_decision(&mut self, approved: bool) {
        self.output = Some(json!({ "approved": approved }));
    }
}

/// Tagged content part of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    ToolCall(ToolInvocationPart),
    /// A result whose call could not be found in the same step
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: ToolResultRecord,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolInvocationPart> {
        match self {
            MessagePart::ToolCall(part) => Some(part),
            _ => None,
        }
    }

    pub fn as_tool_call_mut(&mut self) -> Option<&mut ToolInvocationPart> {
        match self {
            MessagePart::ToolCall(part) => Some(part),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_result_states() {
        let call = ToolCall::new("c1", "http_fetch").with_arg("url", "https://example.com");
        let mut part = ToolInvocationPart::from_call(&call);
        assert_eq!(part.state, ToolPartState::InputAvailable);
        assert!(!part.state.is_terminal());

        part.apply_result(&ToolResultRecord::success("c1", "http_fetch", json!("ok")));
        assert_eq!(part.state, ToolPartState::OutputAvailable);
        assert_eq!(part.output, Some(json!("ok")));

        part.apply_result(&ToolResultRecord::timeout("c1", "http_fetch", 500));
        assert_eq!(part.state, ToolPartState::OutputTimeout);
        assert_eq!(part.error.as_ref().unwrap().code, ToolError::TIMEOUT);
    }

    #[test]
    fn test_confirmation_decision() {
        let mut part = ToolInvocationPart::from_call(&ToolCall::new("c1", "t"));
        part.state = ToolPartState::AwaitingConfirmation;
        assert_eq!(part.confirmation_decision(), None);

        part.record_decision(false);
        assert_eq!(part.confirmation_decision(), Some(false));

        part.state = ToolPartState::OutputAvailable;
        assert_eq!(part.confirmation_decision(), None);
    }

    #[test]
    fn test_part_serialization_tags() {
        let part = MessagePart::ToolCall(ToolInvocationPart::from_call(&ToolCall::new("c1", "t")));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool-call");
        assert_eq!(value["toolCallId"], "c1");
        assert_eq!(value["state"], "input-available");

        let text = serde_json::to_value(MessagePart::text("hi")).unwrap();
        assert_eq!(text, json!({"type": "text", "text": "hi"}));
    }
}
