//! Chat turn progress port.
//!
//! [`ChatProgressNotifier`] is an **output port** that the presentation layer
//! implements to show what a turn is doing (spinner, tool log) alongside the
//! streamed frames. All methods have default no-op implementations, so
//! implementers only override the callbacks they care about.

use chatflow_domain::FinishReason;

/// Progress notifier for chat turns.
pub trait ChatProgressNotifier: Send + Sync {
    /// Called once the registry is assembled
    fn on_registry_assembled(&self, _tool_count: usize) {}

    /// Called when a model step begins
    fn on_step_start(&self, _index: usize, _max_steps: usize) {}

    /// Called for each text chunk received from the model
    fn on_text_chunk(&self, _chunk: &str) {}

    /// Called when a tool is invoked
    fn on_tool_call(&self, _tool_name: &str, _preview: &str) {}

    /// Called when a tool returns a result
    fn on_tool_result(&self, _tool_name: &str, _success: bool) {}

    /// Called when the model asks for a tool that is not in the registry
    fn on_tool_not_found(&self, _tool_name: &str, _available_tools: &[&str]) {}

    /// Called when a manual-mode call is deferred for confirmation
    fn on_tool_deferred(&self, _tool_name: &str) {}

    /// Called when the turn ends
    fn on_turn_end(&self, _finish_reason: FinishReason) {}
}

/// No-op implementation for tests and quiet mode.
pub struct NoChatProgress;

impl ChatProgressNotifier for NoChatProgress {}
