//! Domain layer for chatflow
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A chat turn sees one merged registry of tools drawn from three sources:
//! external providers, stored workflows and built-in default toolkits.
//! Permission sets filter provider tools; mentions only shape guidance.
//!
//! ## Turns and steps
//!
//! A turn runs the model for at most a fixed number of [`ExecutionStep`]s.
//! Every tool call in a step ends in exactly one [`ToolResultRecord`].
//!
//! ## Canvas
//!
//! Results of visual tools become [`CanvasArtifact`]s tracked by id through
//! `pending → partial* → complete | error | timeout`.

pub mod canvas;
pub mod config;
pub mod conversation;
pub mod core;
pub mod execution;
pub mod prompt;
pub mod stream;
pub mod tool;

// Re-export commonly used types
pub use canvas::{ArtifactRegistry, ArtifactStatus, ArtifactUpdate, CanvasArtifact};
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use conversation::{
    ChatMetadata, ConversationMessage, ConversationRepository, MessagePart, REJECTION_MESSAGE,
    RepositoryError, Role, Thread, ToolInvocationPart, ToolPartState,
};
pub use crate::core::error::DomainError;
pub use execution::{ExecutionStep, FinishReason, ToolChoiceMode, ToolSummary, Usage};
pub use prompt::{AgentInstructions, ChatPromptTemplate, MentionGuidance, ToolCatalogEntry};
pub use stream::StreamFrame;
pub use tool::{
    AllowedProviderSet, Mention, ProducerTracker, ProgressState, SchemaToolValidator, ToolCall,
    ToolDefinition, ToolError, ToolOrigin, ToolOutcome, ToolProgress, ToolResultRecord,
    ToolSourceError, ToolSourceKind, ToolValidator, Toolkit, ToolkitSelection,
};
