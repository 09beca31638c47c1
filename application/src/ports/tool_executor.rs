//! Tool executor port
//!
//! Every registry entry is a [`ToolDescriptor`]: a definition, its origin and
//! an [`ToolExecutor`] capability. Executors receive a [`ToolContext`]
//! carrying the request's cancellation signal and a [`ProgressSink`] for
//! intermediate states.

use async_trait::async_trait;
use chatflow_domain::{
    ProducerTracker, ToolCall, ToolDefinition, ToolError, ToolOrigin, ToolProgress,
};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Receiver of progress events from running tools.
///
/// `report` is synchronous and infallible; sinks drop events they cannot
/// deliver.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: ToolProgress);
}

/// No-op sink for tests and non-streaming callers.
pub struct NoProgressSink;

impl ProgressSink for NoProgressSink {
    fn report(&self, _progress: ToolProgress) {}
}

/// Per-call execution context
#[derive(Clone)]
pub struct ToolContext {
    pub call_id: String,
    pub cancellation: CancellationToken,
    pub progress: Arc<dyn ProgressSink>,
}

impl ToolContext {
    pub fn new(
        call_id: impl Into<String>,
        cancellation: CancellationToken,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            cancellation,
            progress,
        }
    }

    /// Context with a fresh token and no progress reporting
    pub fn detached(call_id: impl Into<String>) -> Self {
        Self::new(call_id, CancellationToken::new(), Arc::new(NoProgressSink))
    }

    /// State machine for a progressive producer bound to this call
    pub fn tracker(&self, tool_name: &str) -> ProducerTracker {
        ProducerTracker::new(&self.call_id, tool_name)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Port for executing a single tool
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool call and return its output
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// A registry entry: `{name, schema, execute}` plus origin metadata
#[derive(Clone)]
pub struct ToolDescriptor {
    pub definition: ToolDefinition,
    pub origin: ToolOrigin,
    pub executor: Arc<dyn ToolExecutor>,
}

impl ToolDescriptor {
    pub fn new(
        definition: ToolDefinition,
        origin: ToolOrigin,
        executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        Self {
            definition,
            origin,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.definition.name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
