//! Conversation storage adapters
//!
//! - [`JsonlConversationRepository`]: one JSONL file per thread
//! - [`InMemoryConversationRepository`]: process-local, for tests and
//!   `--ephemeral` sessions

mod jsonl;
mod memory;

pub use jsonl::JsonlConversationRepository;
pub use memory::InMemoryConversationRepository;

use chatflow_domain::{ConversationMessage, RepositoryError};

/// Insert or replace `incoming` by id. Replaced messages keep their
/// position; new ids are appended in the order given.
pub(crate) fn upsert(existing: &mut Vec<ConversationMessage>, incoming: &[ConversationMessage]) {
    for message in incoming {
        match existing.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => *slot = message.clone(),
            None => existing.push(message.clone()),
        }
    }
}

/// Group messages by thread, keeping the first-seen thread order
pub(crate) fn by_thread(messages: &[ConversationMessage]) -> Vec<(&str, Vec<ConversationMessage>)> {
    let mut groups: Vec<(&str, Vec<ConversationMessage>)> = Vec::new();
    for message in messages {
        match groups.iter_mut().find(|(id, _)| *id == message.thread_id) {
            Some((_, group)) => group.push(message.clone()),
            None => groups.push((message.thread_id.as_str(), vec![message.clone()])),
        }
    }
    groups
}

pub(crate) fn lock_poisoned() -> RepositoryError {
    RepositoryError::Io("lock poisoned".to_string())
}
