//! Workflow ports
//!
//! Stored workflows are exposed as tools. Listing them and running them are
//! external collaborators behind these two ports; the runner reports
//! per-node progress through the call's [`ToolContext`].

use async_trait::async_trait;
use chatflow_domain::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::tool_executor::ToolContext;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow definition {id}: {message}")]
    InvalidDefinition { id: String, message: String },

    #[error("Workflow storage error: {0}")]
    Storage(String),
}

/// Metadata of a stored workflow, enough to build a tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the workflow input
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// Lists stored workflow definitions
#[async_trait]
pub trait WorkflowCatalog: Send + Sync {
    async fn list(&self) -> Result<Vec<WorkflowSummary>, WorkflowError>;
}

/// Runs a stored workflow by id
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn run(
        &self,
        workflow_id: &str,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError>;
}
