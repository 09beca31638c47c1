//! Chat parameters - turn loop control.
//!
//! [`ChatParams`] groups the static parameters that control the step loop in
//! [`RunChatUseCase`](crate::use_cases::run_chat::RunChatUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::frame_writer::DEFAULT_FRAME_BUFFER;

/// Turn loop control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParams {
    /// Hard cap on model steps per turn.
    pub max_steps: usize,
    /// Upper bound on a single tool execution.
    pub tool_timeout: Duration,
    /// Surface tool source failures instead of degrading to an empty set.
    pub strict_assembly: bool,
    /// Frames buffered between the turn and its consumer.
    pub frame_buffer: usize,
    /// Replaces the built-in base system prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout: Duration::from_secs(60),
            strict_assembly: false,
            frame_buffer: DEFAULT_FRAME_BUFFER,
            system_prompt: None,
        }
    }
}

impl ChatParams {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_strict_assembly(mut self, strict: bool) -> Self {
        self.strict_assembly = strict;
        self
    }

    pub fn with_frame_buffer(mut self, capacity: usize) -> Self {
        self.frame_buffer = capacity;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ChatParams::default();
        assert_eq!(params.max_steps, 10);
        assert_eq!(params.tool_timeout, Duration::from_secs(60));
        assert!(!params.strict_assembly);
        assert!(params.system_prompt.is_none());
    }

    #[test]
    fn test_builder() {
        let params = ChatParams::default()
            .with_max_steps(0)
            .with_tool_timeout(Duration::from_millis(250))
            .with_strict_assembly(true);

        // A zero step cap would never call the model
        assert_eq!(params.max_steps, 1);
        assert_eq!(params.tool_timeout, Duration::from_millis(250));
        assert!(params.strict_assembly);
    }
}
