//! Execution step entity

use serde::{Deserialize, Serialize};

use super::value_objects::{FinishReason, Usage};
use crate::tool::entities::ToolCall;
use crate::tool::value_objects::ToolResultRecord;

/// One iteration of the model loop.
///
/// Holds the text the model produced, the tool calls it requested and the
/// results captured for them. Results are correlated to calls by `call_id`,
/// never by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Zero-based step index within the turn
    pub index: usize,
    /// Text emitted during this step, in emission order
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_results: Vec<ToolResultRecord>,
    pub finish_reason: FinishReason,
    #[serde(default)]
    pub usage: Usage,
    /// Tool calls were recorded but deliberately not executed (manual mode)
    #[serde(default)]
    pub deferred: bool,
}

impl ExecutionStep {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            text: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            finish_reason: FinishReason::Other,
            usage: Usage::default(),
            deferred: false,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Find the result captured for a call
    pub fn result_for(&self, call_id: &str) -> Option<&ToolResultRecord> {
        self.tool_results.iter().find(|r| r.call_id == call_id)
    }

    /// Calls that have no captured result ("called but no result")
    pub fn unresolved_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.tool_calls
            .iter()
            .filter(|call| self.result_for(&call.call_id).is_none())
    }

    /// Results whose call id matches no call of this step
    pub fn orphan_results(&self) -> impl Iterator<Item = &ToolResultRecord> {
        self.tool_results
            .iter()
            .filter(|r| !self.tool_calls.iter().any(|c| c.call_id == r.call_id))
    }
}
