//! Type definitions for the RunChat use case.

use chatflow_domain::{
    AgentInstructions, AllowedProviderSet, ConversationMessage, ExecutionStep, FinishReason,
    Mention, RepositoryError, ToolChoiceMode, ToolSummary,
};
use thiserror::Error;

use crate::ports::model_backend::BackendError;
use crate::use_cases::assemble_tools::AssembleToolsError;

/// Errors that can occur during a chat turn
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Thread {thread_id} belongs to another identity")]
    Forbidden { thread_id: String },

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Tool not found: {name} (available: {})", .available.join(", "))]
    ToolNotFound { name: String, available: Vec<String> },

    #[error("Invalid arguments for tool {name}: {message}")]
    ToolArgument { name: String, message: String },

    #[error("Tool assembly failed: {0}")]
    Assembly(#[from] AssembleToolsError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ChatError {
    /// HTTP-style status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::Unauthenticated => 401,
            ChatError::Forbidden { .. } => 403,
            ChatError::ThreadNotFound(_) => 404,
            ChatError::InvalidRequest(_) => 400,
            _ => 500,
        }
    }

    /// Whether the client may retry or continue the conversation
    pub fn is_recoverable(&self) -> bool {
        match self {
            ChatError::ToolNotFound { .. } | ChatError::ToolArgument { .. } => true,
            ChatError::Backend(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChatError::Cancelled)
    }
}

/// Input for the RunChat use case
#[derive(Debug, Clone, Default)]
pub struct RunChatInput {
    /// Identity of the caller. Empty means unauthenticated.
    pub identity: String,
    /// Existing thread, or `None` to start a new one
    pub thread_id: Option<String>,
    /// The user's message. `None` continues the thread without a new
    /// message (e.g. after confirming manual tool calls).
    pub message: Option<String>,
    /// Client-assigned id for the user message
    pub message_id: Option<String>,
    pub model: Option<String>,
    pub tool_choice: ToolChoiceMode,
    /// Toolkit names; `None` selects every toolkit
    pub toolkits: Option<Vec<String>>,
    pub allowed_provider_tools: Option<AllowedProviderSet>,
    pub mentions: Vec<Mention>,
    pub agent: Option<AgentInstructions>,
}

impl RunChatInput {
    pub fn new(identity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Continue an existing thread without a new user message
    pub fn continuation(identity: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = mode;
        self
    }

    pub fn with_toolkits(mut self, toolkits: Vec<String>) -> Self {
        self.toolkits = Some(toolkits);
        self
    }

    pub fn with_allowed_providers(mut self, allowed: AllowedProviderSet) -> Self {
        self.allowed_provider_tools = Some(allowed);
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_agent(mut self, agent: AgentInstructions) -> Self {
        self.agent = Some(agent);
        self
    }
}

/// Output from the RunChat use case
#[derive(Debug, Clone)]
pub struct RunChatOutput {
    pub thread_id: String,
    pub user_message_id: Option<String>,
    /// The assistant message as built (and, if `persisted`, stored)
    pub assistant_message: ConversationMessage,
    pub finish_reason: FinishReason,
    pub steps: Vec<ExecutionStep>,
    pub summary: ToolSummary,
    pub persisted: bool,
    /// Error reported on the stream, if the turn failed
    pub error: Option<String>,
}

impl RunChatOutput {
    /// Manual-mode calls waiting for a decision
    pub fn awaiting_confirmation(&self) -> bool {
        self.assistant_message.has_pending_confirmations()
    }
}
