//! External provider tool source

use super::client::McpClient;
use super::error::McpError;
use super::pool::ProviderPool;
use async_trait::async_trait;
use chatflow_application::{
    SourceRequest, ToolContext, ToolDescriptor, ToolExecutor, ToolSourcePort,
};
use chatflow_domain::{
    ToolCall, ToolDefinition, ToolError, ToolOrigin, ToolSourceError, ToolSourceKind,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest tool name model APIs accept
const MAX_TOOL_NAME_LEN: usize = 64;

/// Offers the tools of connected providers, restricted to the request's
/// permission set. A request without a permission set gets nothing and
/// never touches the pool.
pub struct ExternalProviderSource {
    pool: Arc<ProviderPool>,
}

impl ExternalProviderSource {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ToolSourcePort for ExternalProviderSource {
    fn kind(&self) -> ToolSourceKind {
        ToolSourceKind::ExternalProvider
    }

    async fn resolve(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<ToolDescriptor>, ToolSourceError> {
        let Some(allowed) = request.allowed_providers.as_ref() else {
            debug!("No provider permissions on request, skipping external tools");
            return Ok(Vec::new());
        };
        if allowed.is_empty() || self.pool.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.pool.snapshot().await;
        if snapshot.providers.is_empty() && !snapshot.failures.is_empty() {
            let message = snapshot
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.provider_id, f.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolSourceError::unavailable(
                ToolSourceKind::ExternalProvider,
                message,
            ));
        }
        for failure in &snapshot.failures {
            warn!(
                provider = %failure.provider_id,
                "Skipping unavailable provider: {}",
                failure.message
            );
        }

        let mut descriptors = Vec::new();
        for provider in &snapshot.providers {
            let spec = provider.client.spec();
            for tool in &provider.tools {
                if !allowed.permits(&spec.id, &tool.name) {
                    continue;
                }
                let definition = ToolDefinition::new(
                    sanitize_tool_name(&tool.name),
                    tool.description.clone().unwrap_or_default(),
                )
                .with_input_schema(tool.input_schema.clone());
                let origin = ToolOrigin::ExternalProvider {
                    provider_id: spec.id.clone(),
                    provider_name: spec.name.clone(),
                    remote_tool_name: tool.name.clone(),
                };
                let executor = Arc::new(ProviderToolExecutor {
                    client: Arc::clone(&provider.client),
                    remote_name: tool.name.clone(),
                });
                descriptors.push(ToolDescriptor::new(definition, origin, executor));
            }
        }

        debug!(count = descriptors.len(), "Resolved external provider tools");
        Ok(descriptors)
    }
}

/// Forwards calls to the provider that announced the tool
pub struct ProviderToolExecutor {
    client: Arc<McpClient>,
    remote_name: String,
}

#[async_trait]
impl ToolExecutor for ProviderToolExecutor {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        if ctx.is_cancelled() {
            return Err(ToolError::cancelled());
        }

        let result = self
            .client
            .call_tool(&self.remote_name, &call.input, &ctx.cancellation)
            .await
            .map_err(|e| map_call_error(&self.remote_name, e))?;

        if result.is_error {
            let text = result.text();
            let message = if text.is_empty() {
                format!("{} reported an error", self.remote_name)
            } else {
                text
            };
            return Err(ToolError::execution_failed(message));
        }
        Ok(result.into_value())
    }
}

fn map_call_error(tool: &str, error: McpError) -> ToolError {
    match error {
        McpError::Cancelled => ToolError::cancelled(),
        McpError::Timeout(detail) => ToolError::timeout(detail),
        // JSON-RPC "invalid params"
        McpError::RpcError { code: -32602, message } => ToolError::invalid_argument(message),
        other => ToolError::execution_failed(format!("{}: {}", tool, other)),
    }
}

/// Registry-safe version of a remote tool name: `[a-zA-Z0-9_-]{1,64}`
pub fn sanitize_tool_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(MAX_TOOL_NAME_LEN)
        .collect();
    if sanitized.is_empty() {
        "tool".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::client::ProviderSpec;
    use crate::mcp::pool::test_support::fake_connector;
    use chatflow_domain::AllowedProviderSet;
    use serde_json::json;

    fn pool(ids: &[&str]) -> Arc<ProviderPool> {
        let specs = ids.iter().map(|id| ProviderSpec::new(*id, "unused")).collect();
        Arc::new(ProviderPool::with_connector(
            specs,
            fake_connector(vec!["search", "delete", "explode"]),
        ))
    }

    fn request(allowed: Option<AllowedProviderSet>) -> SourceRequest {
        SourceRequest {
            allowed_providers: allowed,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_permission_set_yields_nothing() {
        let pool = pool(&["gh"]);
        let source = ExternalProviderSource::new(Arc::clone(&pool));

        let tools = source.resolve(&request(None)).await.unwrap();
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn test_only_permitted_tools_offered() {
        let source = ExternalProviderSource::new(pool(&["gh", "jira"]));
        let allowed = AllowedProviderSet::new().allow("gh", "search");

        let tools = source.resolve(&request(Some(allowed))).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "search");
        assert_eq!(tools[0].origin.source_id(), Some("gh"));
    }

    #[tokio::test]
    async fn test_all_providers_down_is_unavailable() {
        let source = ExternalProviderSource::new(pool(&["broken-a", "broken-b"]));
        let allowed = AllowedProviderSet::new().allow("broken-a", "search");

        let err = source.resolve(&request(Some(allowed))).await.unwrap_err();
        assert_eq!(err.kind(), ToolSourceKind::ExternalProvider);
    }

    #[tokio::test]
    async fn test_executor_forwards_call() {
        let source = ExternalProviderSource::new(pool(&["gh"]));
        let allowed = AllowedProviderSet::new().allow_all("gh", ["search", "explode"]);
        let tools = source.resolve(&request(Some(allowed))).await.unwrap();

        let search = tools.iter().find(|t| t.name() == "search").unwrap();
        let call = ToolCall::new("c1", "search").with_arg("q", "rust");
        let output = search
            .executor
            .execute(&call, &ToolContext::detached("c1"))
            .await
            .unwrap();
        assert_eq!(output, json!({"tool": "search", "args": {"q": "rust"}}));

        let explode = tools.iter().find(|t| t.name() == "explode").unwrap();
        let err = explode
            .executor
            .execute(&ToolCall::new("c2", "explode"), &ToolContext::detached("c2"))
            .await
            .unwrap_err();
        assert!(err.message.contains("kaboom"));
    }

    #[test]
    fn test_sanitize_tool_name() {
        assert_eq!(sanitize_tool_name("search_issues"), "search_issues");
        assert_eq!(sanitize_tool_name("repo.search/v2"), "repo_search_v2");
        assert_eq!(sanitize_tool_name(""), "tool");
        assert_eq!(sanitize_tool_name(&"x".repeat(80)).len(), 64);
    }
}
