//! Prompt building for chat turns

pub mod chat;
pub mod mention;

pub use chat::{AgentInstructions, ChatPromptTemplate};
pub use mention::{MentionGuidance, ToolCatalogEntry};
