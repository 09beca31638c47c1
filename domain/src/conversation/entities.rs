//! Conversation entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::ChatMetadata;
use super::part::{MessagePart, ToolInvocationPart, ToolPartState};
use crate::core::id::new_message_id;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A thread of messages owned by a single identity (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_id == identity
    }
}

/// A persisted message (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub thread_id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ChatMetadata>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(thread_id: impl Into<String>, role: Role) -> Self {
        Self {
            id: new_message_id(),
            thread_id: thread_id.into(),
            role,
            parts: Vec::new(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(thread_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut message = Self::new(thread_id, Role::User);
        message.parts.push(MessagePart::text(text));
        message
    }

    pub fn assistant(thread_id: impl Into<String>) -> Self {
        Self::new(thread_id, Role::Assistant)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(|p| p.as_text()).collect()
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolInvocationPart> {
        self.parts.iter().filter_map(|p| p.as_tool_call())
    }

    /// Tool calls waiting for a manual confirmation decision
    pub fn awaiting_confirmation(&self) -> impl Iterator<Item = &ToolInvocationPart> {
        self.tool_parts()
            .filter(|p| p.state == ToolPartState::AwaitingConfirmation)
    }

    pub fn has_pending_confirmations(&self) -> bool {
        self.awaiting_confirmation().next().is_some()
    }

    /// Find a tool part by call id for in-place update
    pub fn tool_part_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolInvocationPart> {
        self.parts
            .iter_mut()
            .filter_map(|p| p.as_tool_call_mut())
            .find(|p| p.tool_call_id == tool_call_id)
    }

    /// Remove backend transport metadata that must not be persisted
    pub fn strip_transport_metadata(&mut self) {
        for part in self.parts.iter_mut() {
            if let Some(tool) = part.as_tool_call_mut() {
                tool.provider_metadata = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolCall;
    use serde_json::json;

    #[test]
    fn test_user_message_text() {
        let msg = ConversationMessage::user("thread_1", "Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello");
        assert!(msg.id.starts_with("msg_"));
    }

    #[test]
    fn test_awaiting_confirmation_lookup() {
        let mut pending = ToolInvocationPart::from_call(&ToolCall::new("c1", "http_fetch"));
        pending.state = ToolPartState::AwaitingConfirmation;
        let done = ToolInvocationPart::from_call(&ToolCall::new("c2", "clock_now"));

        let mut msg = ConversationMessage::assistant("t")
            .with_part(MessagePart::text("Let me check."))
            .with_part(MessagePart::ToolCall(pending))
            .with_part(MessagePart::ToolCall(done));

        assert!(msg.has_pending_confirmations());
        assert_eq!(msg.awaiting_confirmation().count(), 1);

        msg.tool_part_mut("c1").unwrap().record_decision(true);
        assert_eq!(
            msg.tool_part_mut("c1").unwrap().confirmation_decision(),
            Some(true)
        );
    }

    #[test]
    fn test_strip_transport_metadata() {
        let mut part = ToolInvocationPart::from_call(&ToolCall::new("c1", "t"));
        part.provider_metadata = Some(json!({"openai": {"index": 0}}));
        let mut msg = ConversationMessage::assistant("t").with_part(MessagePart::ToolCall(part));

        msg.strip_transport_metadata();

        let value = serde_json::to_value(&msg).unwrap();
        assert!(value["parts"][0].get("providerMetadata").is_none());
    }

    #[test]
    fn test_thread_ownership() {
        let thread = Thread::new("thread_1", "alice");
        assert!(thread.is_owned_by("alice"));
        assert!(!thread.is_owned_by("bob"));
    }
}
