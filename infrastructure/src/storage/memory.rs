//! In-memory conversation repository

use super::{by_thread, lock_poisoned, upsert};
use async_trait::async_trait;
use chatflow_domain::{ConversationMessage, ConversationRepository, RepositoryError, Thread};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct StoredThread {
    thread: Option<Thread>,
    messages: Vec<ConversationMessage>,
}

/// Repository that keeps threads in a map. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    threads: RwLock<HashMap<String, StoredThread>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.read().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, RepositoryError> {
        let threads = self.threads.read().map_err(|_| lock_poisoned())?;
        Ok(threads.get(thread_id).and_then(|t| t.thread.clone()))
    }

    async fn create_thread(&self, thread: &Thread) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().map_err(|_| lock_poisoned())?;
        let stored = threads.entry(thread.id.clone()).or_default();
        if stored.thread.is_none() {
            stored.thread = Some(thread.clone());
        }
        Ok(())
    }

    async fn load_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let threads = self.threads.read().map_err(|_| lock_poisoned())?;
        Ok(threads
            .get(thread_id)
            .map(|t| t.messages.clone())
            .unwrap_or_default())
    }

    async fn save_messages(&self, messages: &[ConversationMessage]) -> Result<(), RepositoryError> {
        let mut threads = self.threads.write().map_err(|_| lock_poisoned())?;
        let groups = by_thread(messages);
        if let Some((missing, _)) = groups
            .iter()
            .find(|(id, _)| !threads.get(*id).is_some_and(|t| t.thread.is_some()))
        {
            return Err(RepositoryError::ThreadNotFound(missing.to_string()));
        }
        for (thread_id, group) in groups {
            if let Some(stored) = threads.get_mut(thread_id) {
                upsert(&mut stored.messages, &group);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{MessagePart, Role};

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let repo = InMemoryConversationRepository::new();
        repo.create_thread(&Thread::new("t1", "alice")).await.unwrap();
        repo.create_thread(&Thread::new("t1", "mallory")).await.unwrap();

        let thread = repo.get_thread("t1").await.unwrap().unwrap();
        assert!(thread.is_owned_by("alice"));
        assert_eq!(repo.thread_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_first_position() {
        let repo = InMemoryConversationRepository::new();
        repo.create_thread(&Thread::new("t1", "alice")).await.unwrap();

        let user = ConversationMessage::user("t1", "hi").with_id("m1");
        let reply = ConversationMessage::assistant("t1")
            .with_id("m2")
            .with_part(MessagePart::text("first draft"));
        repo.save_messages(&[user, reply.clone()]).await.unwrap();

        let revised = reply.with_part(MessagePart::text(", revised"));
        repo.save_messages(&[revised]).await.unwrap();

        let messages = repo.load_messages("t1").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].text(), "first draft, revised");

        let last = repo.last_assistant_message("t1").await.unwrap().unwrap();
        assert_eq!(last.id, "m2");
    }

    #[tokio::test]
    async fn test_save_to_unknown_thread_fails() {
        let repo = InMemoryConversationRepository::new();
        let err = repo
            .save_messages(&[ConversationMessage::user("ghost", "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ThreadNotFound(id) if id == "ghost"));
    }
}
