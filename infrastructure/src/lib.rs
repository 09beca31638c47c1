//! Infrastructure layer for chatflow
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod backend;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod storage;
pub mod tools;
pub mod workflow;

// Re-export commonly used types
pub use backend::OpenAiBackend;
pub use config::{
    ConfigLoader, ConfigValidationError, FileBackendConfig, FileCanvasConfig, FileChatConfig,
    FileConfig, FileLoggingConfig, FileOutputConfig, FileProviderServerConfig,
    FileProvidersConfig, FileStorageConfig, FileWorkflowsConfig,
};
pub use logging::JsonlTraceSink;
pub use mcp::{ExternalProviderSource, McpClient, McpError, ProviderPool, ProviderSpec};
pub use storage::{InMemoryConversationRepository, JsonlConversationRepository};
pub use tools::DefaultToolkitSource;
pub use workflow::{FileWorkflowStore, WorkflowEngine, WorkflowToolSource};
