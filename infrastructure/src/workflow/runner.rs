//! Workflow execution.
//!
//! Nodes run sequentially. The runner reports `pending` when the workflow
//! starts and one `partial` per finished node, so the client sees the
//! workflow advance node by node.

use super::definition::{NodeAction, WorkflowDefinition, render};
use super::store::FileWorkflowStore;
use async_trait::async_trait;
use chatflow_application::{
    NoProgressSink, ToolContext, ToolDescriptor, WorkflowError, WorkflowRunner,
};
use chatflow_domain::tool::progress::ProgressTransitionError;
use chatflow_domain::{ToolCall, ToolError};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs stored workflows against a fixed set of in-process tools
pub struct WorkflowEngine {
    store: Arc<FileWorkflowStore>,
    tools: HashMap<String, ToolDescriptor>,
}

impl WorkflowEngine {
    pub fn new(store: Arc<FileWorkflowStore>) -> Self {
        Self {
            store,
            tools: HashMap::new(),
        }
    }

    /// Tools that `kind = "tool"` nodes may call (builder pattern)
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        for tool in tools {
            self.tools.insert(tool.name().to_string(), tool);
        }
        self
    }

    /// Execute a loaded definition
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let tool_name = definition.tool_name();
        let mut tracker = ctx.tracker(&tool_name);
        let progress_error =
            |e: ProgressTransitionError| ToolError::execution_failed(e.to_string());

        let total = definition.nodes.len();
        info!(workflow = %definition.id, nodes = total, "Running workflow");
        ctx.progress.report(
            tracker
                .pending(json!({
                    "workflow_id": definition.id,
                    "nodes": definition.nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
                }))
                .map_err(progress_error)?,
        );

        let mut outputs = Map::new();
        let mut last = Value::Null;

        for (index, node) in definition.nodes.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(ToolError::cancelled());
            }
            let scope = json!({"input": input, "nodes": outputs});

            let output = match &node.action {
                NodeAction::Value { value } => {
                    render(value, &scope).map_err(ToolError::invalid_argument)?
                }
                NodeAction::Tool { tool, input: template } => {
                    let node_input = render(template, &scope).map_err(ToolError::invalid_argument)?;
                    self.run_tool(tool, &node.id, node_input, ctx)
                        .await
                        .map_err(|e| {
                            let message = format!("node '{}' failed: {}", node.id, e.message);
                            ToolError::new(e.code, message)
                        })?
                }
            };
            debug!(workflow = %definition.id, node = %node.id, "Workflow node finished");

            ctx.progress.report(
                tracker
                    .partial(json!({
                        "workflow_id": definition.id,
                        "node": node.id,
                        "completed": index + 1,
                        "total": total,
                        "output": output,
                    }))
                    .map_err(progress_error)?,
            );
            outputs.insert(node.id.clone(), output.clone());
            last = output;
        }
        tracker.finish().map_err(progress_error)?;

        let result = match &definition.output {
            Some(template) => render(template, &json!({"input": input, "nodes": outputs}))
                .map_err(ToolError::invalid_argument)?,
            None => last,
        };

        Ok(json!({
            "workflow_id": definition.id,
            "output": result,
            "nodes": outputs,
        }))
    }

    async fn run_tool(
        &self,
        tool: &str,
        node_id: &str,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let descriptor = self.tools.get(tool).ok_or_else(|| ToolError::unknown_tool(tool))?;
        // Nested calls stay internal: no progress of their own
        let call_id = format!("{}:{}", ctx.call_id, node_id);
        let nested =
            ToolContext::new(call_id.clone(), ctx.cancellation.clone(), Arc::new(NoProgressSink));
        let call = ToolCall::new(call_id, tool).with_input(input);
        descriptor.executor.execute(&call, &nested).await
    }
}

#[async_trait]
impl WorkflowRunner for WorkflowEngine {
    async fn run(
        &self,
        workflow_id: &str,
        input: Value,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let definition = self.store.get(workflow_id).await.map_err(|e| match e {
            WorkflowError::NotFound(id) => ToolError::not_found(format!("workflow {}", id)),
            other => ToolError::execution_failed(other.to_string()),
        })?;
        self.execute(&definition, input, ctx).await
    }
}
