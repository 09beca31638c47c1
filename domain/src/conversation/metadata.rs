//! Chat metadata attached to persisted assistant messages

use serde::{Deserialize, Serialize};

use crate::execution::value_objects::{FinishReason, ToolChoiceMode, Usage};

/// Metadata recorded with an assistant message. Written once at turn end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub tool_choice_mode: ToolChoiceMode,
    /// Number of tools in the assembled registry
    pub tool_count: usize,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub step_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatMetadata {
    pub fn new(tool_choice_mode: ToolChoiceMode, tool_count: usize) -> Self {
        Self {
            agent_id: None,
            tool_choice_mode,
            tool_count,
            usage: Usage::default(),
            finish_reason: None,
            step_count: 0,
            model: None,
        }
    }

    pub fn with_agent_id(mut self, agent_id: Option<String>) -> Self {
        self.agent_id = agent_id;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
