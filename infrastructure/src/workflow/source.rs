//! Workflow tool source: one tool per stored workflow

use crate::mcp::sanitize_tool_name;
use async_trait::async_trait;
use chatflow_application::{
    SourceRequest, ToolContext, ToolDescriptor, ToolExecutor, ToolSourcePort, WorkflowCatalog,
    WorkflowRunner,
};
use chatflow_domain::{
    ToolCall, ToolDefinition, ToolError, ToolOrigin, ToolSourceError, ToolSourceKind,
};
use serde_json::{Value, json};
use std::sync::Arc;

pub struct WorkflowToolSource {
    catalog: Arc<dyn WorkflowCatalog>,
    runner: Arc<dyn WorkflowRunner>,
}

impl WorkflowToolSource {
    pub fn new(catalog: Arc<dyn WorkflowCatalog>, runner: Arc<dyn WorkflowRunner>) -> Self {
        Self { catalog, runner }
    }
}

#[async_trait]
impl ToolSourcePort for WorkflowToolSource {
    fn kind(&self) -> ToolSourceKind {
        ToolSourceKind::Workflow
    }

    async fn resolve(
        &self,
        _request: &SourceRequest,
    ) -> Result<Vec<ToolDescriptor>, ToolSourceError> {
        let summaries = self.catalog.list().await.map_err(|e| {
            ToolSourceError::discovery_failed(ToolSourceKind::Workflow, e.to_string())
        })?;

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let description = if summary.description.is_empty() {
                    format!("Run the stored workflow '{}'", summary.name)
                } else {
                    summary.description.clone()
                };
                let schema = summary
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
                let definition = ToolDefinition::new(sanitize_tool_name(&summary.name), description)
                    .with_input_schema(schema);
                let executor = Arc::new(WorkflowToolExecutor {
                    runner: Arc::clone(&self.runner),
                    workflow_id: summary.id.clone(),
                });
                let origin = ToolOrigin::Workflow {
                    workflow_id: summary.id,
                    workflow_name: summary.name,
                };
                ToolDescriptor::new(definition, origin, executor)
            })
            .collect())
    }
}

struct WorkflowToolExecutor {
    runner: Arc<dyn WorkflowRunner>,
    workflow_id: String,
}

#[async_trait]
impl ToolExecutor for WorkflowToolExecutor {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        self.runner.run(&self.workflow_id, call.input.clone(), ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{FileWorkflowStore, WorkflowEngine};
    use chatflow_application::{WorkflowError, WorkflowSummary};

    struct BrokenCatalog;

    #[async_trait]
    impl WorkflowCatalog for BrokenCatalog {
        async fn list(&self) -> Result<Vec<WorkflowSummary>, WorkflowError> {
            Err(WorkflowError::Storage("disk on fire".to_string()))
        }
    }

    #[tokio::test]
    async fn test_each_workflow_becomes_a_tool() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = json!({
            "id": "wf_a",
            "name": "greet user",
            "nodes": [{"id": "v", "kind": "value", "value": "hi {{input.who}}"}],
            "input_schema": {
                "type": "object",
                "properties": {"who": {"type": "string"}},
                "required": ["who"]
            }
        });
        std::fs::write(dir.path().join("a.json"), workflow.to_string()).unwrap();
        let store = Arc::new(FileWorkflowStore::new(dir.path()));
        let source = WorkflowToolSource::new(store.clone(), Arc::new(WorkflowEngine::new(store)));

        let tools = source.resolve(&SourceRequest::default()).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "greet_user");
        assert_eq!(tools[0].definition.required_properties(), vec!["who"]);
        assert_eq!(tools[0].origin.source_id(), Some("wf_a"));

        let call = ToolCall::new("c1", "greet_user").with_arg("who", "Ada");
        let output = tools[0]
            .executor
            .execute(&call, &ToolContext::detached("c1"))
            .await
            .unwrap();
        assert_eq!(output["output"], "hi Ada");
    }

    #[tokio::test]
    async fn test_catalog_failure_is_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileWorkflowStore::new(dir.path()));
        let engine = Arc::new(WorkflowEngine::new(store));
        let source = WorkflowToolSource::new(Arc::new(BrokenCatalog), engine);

        let err = source.resolve(&SourceRequest::default()).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::DiscoveryFailed { .. }));
    }
}
