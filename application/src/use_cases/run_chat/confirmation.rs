//! Manual confirmation gateway.
//!
//! In manual mode the executor stores proposed calls as
//! `awaiting-confirmation` parts. On the next turn this gateway reads the
//! recorded decision of each part and either runs the real tool or writes
//! the fixed rejection string. A part with no decision counts as rejected.

use chatflow_domain::{
    ConversationMessage, REJECTION_MESSAGE, ToolError, ToolPartState, ToolResultRecord,
    ToolValidator,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::executor::invoke_tool;
use crate::ports::tool_executor::ProgressSink;
use crate::registry::ToolRegistry;

/// What the gateway did to a message
#[derive(Debug, Default)]
pub(super) struct GatewayReport {
    /// Results to emit as frames, in part order
    pub results: Vec<ToolResultRecord>,
    pub approved: usize,
    pub rejected: usize,
}

impl GatewayReport {
    /// Whether the message was modified and must be saved again
    pub fn changed(&self) -> bool {
        !self.results.is_empty()
    }
}

/// Resolve every part awaiting confirmation on `message`, in place.
///
/// Parts left untouched when the turn is cancelled mid-way stay pending.
pub(super) async fn resolve_pending(
    message: &mut ConversationMessage,
    registry: &ToolRegistry,
    validator: &dyn ToolValidator,
    tool_timeout: Duration,
    cancel: &CancellationToken,
    progress: Arc<dyn ProgressSink>,
) -> GatewayReport {
    let mut report = GatewayReport::default();

    for part in message
        .parts
        .iter_mut()
        .filter_map(|p| p.as_tool_call_mut())
        .filter(|p| p.state == ToolPartState::AwaitingConfirmation)
    {
        if cancel.is_cancelled() {
            break;
        }

        let call = part.to_call();
        let approved = part.confirmation_decision().unwrap_or_else(|| {
            debug!(
                tool = %part.tool_name,
                call_id = %part.tool_call_id,
                "No decision recorded; treating as rejected"
            );
            false
        });

        if !approved {
            info!(
                tool = %part.tool_name,
                call_id = %part.tool_call_id,
                "Tool call rejected by user"
            );
            let record = ToolResultRecord::success(
                &part.tool_call_id,
                &part.tool_name,
                Value::String(REJECTION_MESSAGE.to_string()),
            );
            part.apply_result(&record);
            report.rejected += 1;
            report.results.push(record);
            continue;
        }

        let record = match registry.get(&call.tool_name) {
            None => {
                warn!(tool = %call.tool_name, "Confirmed tool is no longer available");
                Some(ToolResultRecord::failure(
                    &call.call_id,
                    &call.tool_name,
                    ToolError::unknown_tool(&call.tool_name),
                ))
            }
            Some(descriptor) => match validator.validate(&call, &descriptor.definition) {
                Err(message) => Some(ToolResultRecord::failure(
                    &call.call_id,
                    &call.tool_name,
                    ToolError::invalid_argument(message),
                )),
                Ok(()) => {
                    info!(
                        tool = %call.tool_name,
                        call_id = %call.call_id,
                        "Executing confirmed tool call"
                    );
                    invoke_tool(descriptor, &call, tool_timeout, cancel, progress.clone()).await
                }
            },
        };

        // Cancelled while running: leave the part pending
        let Some(record) = record else {
            break;
        };
        part.apply_result(&record);
        report.approved += 1;
        report.results.push(record);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_executor::NoProgressSink;
    use crate::registry::test_support::*;
    use chatflow_domain::{MessagePart, SchemaToolValidator, ToolCall, ToolInvocationPart};
    use serde_json::json;

    fn pending_part(call_id: &str, tool: &str) -> MessagePart {
        let mut part = ToolInvocationPart::from_call(&ToolCall::new(call_id, tool));
        part.state = ToolPartState::AwaitingConfirmation;
        MessagePart::ToolCall(part)
    }

    fn registry_with(executor: Arc<EchoExecutor>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.insert(descriptor_with("get_time", default_origin(), executor));
        registry
    }

    async fn resolve(message: &mut ConversationMessage, registry: &ToolRegistry) -> GatewayReport {
        resolve_pending(
            message,
            registry,
            &SchemaToolValidator,
            Duration::from_secs(5),
            &CancellationToken::new(),
            Arc::new(NoProgressSink),
        )
        .await
    }

    #[tokio::test]
    async fn test_rejection_never_invokes_tool() {
        let executor = Arc::new(EchoExecutor::default());
        let registry = registry_with(executor.clone());
        let mut message =
            ConversationMessage::assistant("t1").with_part(pending_part("c1", "get_time"));
        message.tool_part_mut("c1").unwrap().record_decision(false);

        let report = resolve(&mut message, &registry).await;

        assert_eq!(executor.count(), 0);
        assert_eq!(report.rejected, 1);
        let part = message.tool_parts().next().unwrap();
        assert_eq!(part.state, ToolPartState::OutputAvailable);
        assert_eq!(part.output, Some(json!(REJECTION_MESSAGE)));
    }

    #[tokio::test]
    async fn test_missing_decision_is_rejection() {
        let executor = Arc::new(EchoExecutor::default());
        let registry = registry_with(executor.clone());
        let mut message =
            ConversationMessage::assistant("t1").with_part(pending_part("c1", "get_time"));

        let report = resolve(&mut message, &registry).await;

        assert_eq!(executor.count(), 0);
        assert_eq!(report.rejected, 1);
        assert!(!message.has_pending_confirmations());
    }

    #[tokio::test]
    async fn test_approval_runs_tool_with_recorded_input() {
        let executor = Arc::new(EchoExecutor::default());
        let registry = registry_with(executor.clone());
        let mut message =
            ConversationMessage::assistant("t1").with_part(pending_part("c1", "get_time"));
        message.tool_part_mut("c1").unwrap().record_decision(true);

        let report = resolve(&mut message, &registry).await;

        assert_eq!(executor.count(), 1);
        assert_eq!(report.approved, 1);
        assert!(report.changed());
        let part = message.tool_parts().next().unwrap();
        assert_eq!(part.state, ToolPartState::OutputAvailable);
        assert!(part.output.as_ref().unwrap().get("echo").is_some());
    }

    #[tokio::test]
    async fn test_approved_unknown_tool_becomes_error() {
        let registry = ToolRegistry::new();
        let mut message =
            ConversationMessage::assistant("t1").with_part(pending_part("c1", "gone"));
        message.tool_part_mut("c1").unwrap().record_decision(true);

        resolve(&mut message, &registry).await;

        let part = message.tool_parts().next().unwrap();
        assert_eq!(part.state, ToolPartState::OutputError);
        assert!(part.error.as_ref().unwrap().is_not_found());
    }
}
