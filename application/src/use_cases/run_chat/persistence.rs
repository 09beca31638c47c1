//! Message persistence builder.
//!
//! Rebuilds the canonical assistant message from step history once the
//! stream has finished. The live text stream is never consulted.

use chatflow_domain::core::id::new_message_id;
use chatflow_domain::{
    ChatMetadata, ConversationMessage, ExecutionStep, MessagePart, ToolInvocationPart,
    ToolPartState,
};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Pick the assistant message id, minting a fresh one when the candidate
/// collides with the inbound user message.
pub(super) fn assistant_message_id(candidate: String, user_message_id: Option<&str>) -> String {
    if user_message_id == Some(candidate.as_str()) {
        let fresh = new_message_id();
        warn!(
            colliding = %candidate,
            assigned = %fresh,
            "Assistant message id collided with user message id"
        );
        fresh
    } else {
        candidate
    }
}

/// Build the assistant message for a finished turn.
///
/// Parts follow emission order: each step contributes its text, then one
/// part per call with its result merged, then any orphan results. Calls
/// without a result become `awaiting-confirmation` in deferred steps and
/// `aborted` otherwise. Transport metadata is attached here and stripped
/// before the message is saved.
pub(super) fn build_assistant_message(
    thread_id: &str,
    message_id: String,
    user_message_id: Option<&str>,
    steps: &[ExecutionStep],
    transport_metadata: &HashMap<String, Value>,
    metadata: ChatMetadata,
) -> ConversationMessage {
    let id = assistant_message_id(message_id, user_message_id);
    let mut message = ConversationMessage::assistant(thread_id).with_id(id);

    for step in steps {
        if !step.text.is_empty() {
            message.parts.push(MessagePart::text(&step.text));
        }

        for call in &step.tool_calls {
            let mut part = ToolInvocationPart::from_call(call);
            part.provider_metadata = transport_metadata.get(&call.call_id).cloned();
            match step.result_for(&call.call_id) {
                Some(result) => part.apply_result(result),
                None if step.deferred => part.state = ToolPartState::AwaitingConfirmation,
                None => part.state = ToolPartState::Aborted,
            }
            message.parts.push(MessagePart::ToolCall(part));
        }

        for orphan in step.orphan_results() {
            message.parts.push(MessagePart::ToolResult {
                tool_call_id: orphan.call_id.clone(),
                tool_name: orphan.tool_name.clone(),
                result: orphan.clone(),
            });
        }
    }

    message.metadata = Some(metadata);
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{FinishReason, ToolCall, ToolChoiceMode, ToolResultRecord};
    use serde_json::json;

    fn metadata() -> ChatMetadata {
        ChatMetadata::new(ToolChoiceMode::Auto, 3)
    }

    fn two_steps() -> Vec<ExecutionStep> {
        let mut first = ExecutionStep::new(0);
        first.text = "Let me check.".into();
        first.tool_calls = vec![ToolCall::new("c1", "get_time"), ToolCall::new("c2", "fetch_url")];
        first.tool_results = vec![
            ToolResultRecord::success("c1", "get_time", json!("12:00")),
            ToolResultRecord::timeout("c2", "fetch_url", 60_000),
        ];
        first.finish_reason = FinishReason::ToolCalls;

        let mut second = ExecutionStep::new(1);
        second.text = "It is noon.".into();
        second.finish_reason = FinishReason::Stop;
        vec![first, second]
    }

    #[test]
    fn test_parts_follow_step_order() {
        let message = build_assistant_message(
            "t1",
            "m2".into(),
            Some("m1"),
            &two_steps(),
            &HashMap::new(),
            metadata(),
        );

        assert_eq!(message.id, "m2");
        let kinds: Vec<&str> = message
            .parts
            .iter()
            .map(|p| match p {
                MessagePart::Text { .. } => "text",
                MessagePart::ToolCall(_) => "call",
                MessagePart::ToolResult { .. } => "result",
            })
            .collect();
        assert_eq!(kinds, vec!["text", "call", "call", "text"]);

        let states: Vec<ToolPartState> = message.tool_parts().map(|p| p.state).collect();
        assert_eq!(
            states,
            vec![ToolPartState::OutputAvailable, ToolPartState::OutputTimeout]
        );
        assert_eq!(message.text(), "Let me check.It is noon.");
    }

    #[test]
    fn test_unresolved_call_is_aborted_unless_deferred() {
        let mut step = ExecutionStep::new(0);
        step.tool_calls = vec![ToolCall::new("c1", "get_time")];
        let aborted = build_assistant_message(
            "t1",
            "m2".into(),
            None,
            &[step.clone()],
            &HashMap::new(),
            metadata(),
        );
        assert_eq!(aborted.tool_parts().next().unwrap().state, ToolPartState::Aborted);

        step.deferred = true;
        let deferred =
            build_assistant_message("t1", "m2".into(), None, &[step], &HashMap::new(), metadata());
        assert!(deferred.has_pending_confirmations());
    }

    #[test]
    fn test_id_collision_mints_new_id() {
        let message = build_assistant_message(
            "t1",
            "same".into(),
            Some("same"),
            &[],
            &HashMap::new(),
            metadata(),
        );
        assert_ne!(message.id, "same");
        assert!(message.id.starts_with("msg_"));
    }

    #[test]
    fn test_transport_metadata_attached_then_strippable() {
        let mut transport = HashMap::new();
        transport.insert("c1".to_string(), json!({"index": 0}));
        let mut message =
            build_assistant_message("t1", "m2".into(), None, &two_steps(), &transport, metadata());
        assert!(message.tool_parts().next().unwrap().provider_metadata.is_some());

        message.strip_transport_metadata();
        assert!(message.tool_parts().all(|p| p.provider_metadata.is_none()));
    }

    #[test]
    fn test_orphan_result_kept_as_result_part() {
        let mut step = ExecutionStep::new(0);
        step.tool_results = vec![ToolResultRecord::success("zz", "get_time", json!(1))];
        let message =
            build_assistant_message("t1", "m2".into(), None, &[step], &HashMap::new(), metadata());
        assert!(matches!(message.parts[0], MessagePart::ToolResult { .. }));
    }
}
