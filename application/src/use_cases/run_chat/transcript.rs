//! Model-facing transcript reconstruction.
//!
//! Stored messages are converted back into [`ModelMessage`]s. An assistant
//! message spanning several steps is split at every text part that follows
//! tool calls, so each step becomes one assistant message followed by its
//! tool results.

use chatflow_domain::{
    ConversationMessage, MessagePart, Role, ToolCall, ToolInvocationPart, ToolPartState,
};
use serde_json::Value;

use crate::ports::model_backend::ModelMessage;

/// Build the transcript for the first step of a turn
pub(super) fn build_transcript(
    system_prompt: String,
    history: &[ConversationMessage],
    user_message: Option<&ConversationMessage>,
) -> Vec<ModelMessage> {
    let mut messages = vec![ModelMessage::System(system_prompt)];
    for message in history.iter().chain(user_message) {
        append_message(&mut messages, message);
    }
    messages
}

fn append_message(messages: &mut Vec<ModelMessage>, message: &ConversationMessage) {
    match message.role {
        Role::System => messages.push(ModelMessage::System(message.text())),
        Role::User => messages.push(ModelMessage::User(message.text())),
        Role::Assistant => append_assistant(messages, message),
    }
}

fn append_assistant(messages: &mut Vec<ModelMessage>, message: &ConversationMessage) {
    let mut text = String::new();
    let mut calls: Vec<&ToolInvocationPart> = Vec::new();

    for part in &message.parts {
        match part {
            MessagePart::Text { text: segment } => {
                if !calls.is_empty() {
                    flush_step(messages, std::mem::take(&mut text), &mut calls);
                }
                text.push_str(segment);
            }
            MessagePart::ToolCall(tool) => calls.push(tool),
            // Orphan results have no call to attach to
            MessagePart::ToolResult { .. } => {}
        }
    }

    if !text.is_empty() || !calls.is_empty() {
        flush_step(messages, text, &mut calls);
    }
}

fn flush_step(
    messages: &mut Vec<ModelMessage>,
    text: String,
    calls: &mut Vec<&ToolInvocationPart>,
) {
    messages.push(ModelMessage::Assistant {
        text,
        tool_calls: calls.iter().map(|p| p.to_call()).collect::<Vec<ToolCall>>(),
    });
    for part in calls.drain(..) {
        messages.push(ModelMessage::ToolResult {
            call_id: part.tool_call_id.clone(),
            tool_name: part.tool_name.clone(),
            content: result_content(part),
        });
    }
}

/// Text the model sees for a stored tool part
pub(super) fn result_content(part: &ToolInvocationPart) -> String {
    match part.state {
        ToolPartState::OutputAvailable => match &part.output {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        },
        ToolPartState::OutputError | ToolPartState::OutputTimeout => match &part.error {
            Some(error) => format!("Error: {}", error),
            None => "Error: tool failed".to_string(),
        },
        ToolPartState::AwaitingConfirmation => {
            "Error: tool call is awaiting user confirmation and was not executed".to_string()
        }
        ToolPartState::InputAvailable | ToolPartState::Aborted => {
            "Error: tool call did not complete".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{REJECTION_MESSAGE, ToolResultRecord};
    use serde_json::json;

    fn assistant_with_two_steps() -> ConversationMessage {
        let first = ToolCall::new("c1", "get_time");
        let second = ToolCall::new("c2", "fetch_url").with_arg("url", "https://a.test");

        let mut p1 = ToolInvocationPart::from_call(&first);
        p1.apply_result(&ToolResultRecord::success("c1", "get_time", json!("12:00")));
        let mut p2 = ToolInvocationPart::from_call(&second);
        p2.state = ToolPartState::Aborted;

        ConversationMessage::assistant("t1")
            .with_part(MessagePart::text("Checking."))
            .with_part(MessagePart::ToolCall(p1))
            .with_part(MessagePart::text("Now fetching."))
            .with_part(MessagePart::ToolCall(p2))
            .with_part(MessagePart::text("Done."))
    }

    #[test]
    fn test_assistant_split_per_step() {
        let history = vec![
            ConversationMessage::user("t1", "What time is it?"),
            assistant_with_two_steps(),
        ];
        let transcript = build_transcript("sys".into(), &history, None);

        assert_eq!(transcript[0], ModelMessage::System("sys".into()));
        assert_eq!(transcript[1], ModelMessage::User("What time is it?".into()));
        match &transcript[2] {
            ModelMessage::Assistant { text, tool_calls } => {
                assert_eq!(text, "Checking.");
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].call_id, "c1");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            transcript[3],
            ModelMessage::ToolResult {
                call_id: "c1".into(),
                tool_name: "get_time".into(),
                content: "12:00".into(),
            }
        );
        match &transcript[5] {
            ModelMessage::ToolResult { content, .. } => {
                assert!(content.contains("did not complete"))
            }
            other => panic!("unexpected {:?}", other),
        }
        match &transcript[6] {
            ModelMessage::Assistant { text, tool_calls } => {
                assert_eq!(text, "Done.");
                assert!(tool_calls.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(transcript.len(), 7);
    }

    #[test]
    fn test_new_user_message_last() {
        let user = ConversationMessage::user("t1", "hello");
        let transcript = build_transcript("sys".into(), &[], Some(&user));
        assert_eq!(transcript.last(), Some(&ModelMessage::User("hello".into())));
    }

    #[test]
    fn test_rejection_reaches_model_verbatim() {
        let mut part = ToolInvocationPart::from_call(&ToolCall::new("c1", "fetch_url"));
        part.state = ToolPartState::OutputAvailable;
        part.output = Some(Value::String(REJECTION_MESSAGE.to_string()));
        assert_eq!(result_content(&part), REJECTION_MESSAGE);
    }
}
