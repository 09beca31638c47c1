//! Conversation repository trait

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{ConversationMessage, Thread};

/// Error type for repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for threads and messages
///
/// This is a domain-level abstraction of the durable storage layer.
/// Implementations live in the infrastructure layer.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Look up a thread by id
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, RepositoryError>;

    /// Create a thread. Creating an existing id is a no-op.
    async fn create_thread(&self, thread: &Thread) -> Result<(), RepositoryError>;

    /// Load all messages of a thread in insertion order
    async fn load_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ConversationMessage>, RepositoryError>;

    /// Insert or replace messages by id, preserving first-insertion order
    async fn save_messages(&self, messages: &[ConversationMessage]) -> Result<(), RepositoryError>;

    /// Latest assistant message of a thread, if any
    async fn last_assistant_message(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationMessage>, RepositoryError> {
        let messages = self.load_messages(thread_id).await?;
        Ok(messages
            .into_iter()
            .rev()
            .find(|m| m.role == super::entities::Role::Assistant))
    }
}
