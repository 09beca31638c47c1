//! Conversation domain module
//!
//! The canonical, persisted form of a chat: [`Thread`]s owned by one
//! identity, holding [`ConversationMessage`]s made of ordered
//! [`MessagePart`]s. Assistant messages are rebuilt from step history at the
//! end of a turn, independent of the live text stream.

pub mod entities;
pub mod metadata;
pub mod part;
pub mod repository;

pub use entities::{ConversationMessage, Role, Thread};
pub use metadata::ChatMetadata;
pub use part::{MessagePart, REJECTION_MESSAGE, ToolInvocationPart, ToolPartState};
pub use repository::{ConversationRepository, RepositoryError};
