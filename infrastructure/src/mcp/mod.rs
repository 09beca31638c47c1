//! External tool providers.
//!
//! Providers are child processes speaking newline-delimited JSON-RPC
//! (`initialize` → `tools/list` → `tools/call`). The [`ProviderPool`] owns
//! the connections; [`ExternalProviderSource`] turns their tools into
//! registry entries for one request.

mod client;
mod error;
mod pool;
mod protocol;
mod source;
mod transport;

pub use client::{McpClient, ProviderSpec};
pub use error::McpError;
pub use pool::{ConnectedProvider, Connector, PoolSnapshot, ProviderFailure, ProviderPool};
pub use protocol::{CallToolResult, RemoteToolDefinition, ToolContent};
pub use source::{ExternalProviderSource, ProviderToolExecutor, sanitize_tool_name};
pub use transport::StdioTransport;
