//! Client for one external tool provider

use super::error::{McpError, Result};
use super::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsResult,
    RemoteToolDefinition, ServerInfo,
};
use super::transport::StdioTransport;
use crate::config::FileProviderServerConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on `tools/list` pages, against providers that loop cursors
const MAX_LIST_PAGES: usize = 64;

/// Everything needed to start and address a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub id: String,
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub request_timeout: Duration,
}

impl ProviderSpec {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl From<&FileProviderServerConfig> for ProviderSpec {
    fn from(config: &FileProviderServerConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// Initialized connection to a provider
pub struct McpClient {
    spec: ProviderSpec,
    transport: StdioTransport,
    server_info: Option<ServerInfo>,
}

impl McpClient {
    /// Spawn the provider process and perform the handshake
    pub async fn connect(spec: ProviderSpec) -> Result<Self> {
        let transport = StdioTransport::spawn(&spec).await?;
        Self::initialize(spec, transport).await
    }

    /// Handshake over an existing transport: `initialize`, then the
    /// `notifications/initialized` notification
    pub async fn initialize(spec: ProviderSpec, transport: StdioTransport) -> Result<Self> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let raw = transport
            .request("initialize", Some(params), spec.request_timeout)
            .await?;
        let result: InitializeResult = serde_json::from_value(raw)
            .map_err(|e| McpError::UnexpectedResponse(format!("initialize: {}", e)))?;

        if let Some(version) = &result.protocol_version
            && version != super::protocol::PROTOCOL_VERSION
        {
            debug!(
                provider = %spec.id,
                version = %version,
                "Provider negotiated a different protocol version"
            );
        }

        transport.notify("notifications/initialized", None).await?;

        info!(
            provider = %spec.id,
            server = ?result.server_info.as_ref().map(|s| s.name.as_str()),
            "Provider initialized"
        );

        Ok(Self {
            spec,
            transport,
            server_info: result.server_info,
        })
    }

    /// All tools the provider announces, following `nextCursor` pages
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let raw = self
                .transport
                .request("tools/list", params, self.spec.request_timeout)
                .await?;
            let page: ListToolsResult = serde_json::from_value(raw)
                .map_err(|e| McpError::UnexpectedResponse(format!("tools/list: {}", e)))?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(provider = %self.spec.id, "tools/list pagination did not terminate, truncating");
        Ok(tools)
    }

    /// Invoke one tool. Cancellation abandons the request.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
        cancellation: &CancellationToken,
    ) -> Result<CallToolResult> {
        let params = serde_json::to_value(CallToolParams { name, arguments })?;

        let request = self
            .transport
            .request("tools/call", Some(params), self.spec.request_timeout);
        let raw = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(McpError::Cancelled),
            result = request => result?,
        };

        serde_json::from_value(raw)
            .map_err(|e| McpError::UnexpectedResponse(format!("tools/call: {}", e)))
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn is_alive(&self) -> bool {
        !self.transport.is_closed()
    }

    /// Whether the provider announced a tool list change since last asked
    pub fn tools_changed(&self) -> bool {
        self.transport.take_tools_changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::transport::test_support::fake_provider;
    use serde_json::json;

    fn spec() -> ProviderSpec {
        ProviderSpec::new("fake", "unused").with_request_timeout(Duration::from_secs(5))
    }

    fn paginated_server() -> StdioTransport {
        fake_provider(|method, params| match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "fake-server", "version": "1.0"}
            })),
            "tools/list" => match params.get("cursor").and_then(|c| c.as_str()) {
                None => Ok(json!({
                    "tools": [{"name": "search", "description": "Search things"}],
                    "nextCursor": "page2"
                })),
                Some("page2") => Ok(json!({
                    "tools": [{
                        "name": "fetch",
                        "inputSchema": {"type": "object", "properties": {"id": {"type": "string"}}}
                    }]
                })),
                Some(other) => Err((-32602, format!("bad cursor {}", other))),
            },
            "tools/call" => {
                let name = params["name"].as_str().unwrap_or_default();
                if name == "fail" {
                    Ok(json!({"content": [{"type": "text", "text": "boom"}], "isError": true}))
                } else {
                    Ok(json!({"content": [{"type": "text", "text": format!("called {}", name)}]}))
                }
            }
            other => Err((-32601, format!("Method not found: {}", other))),
        })
    }

    #[tokio::test]
    async fn test_handshake_records_server_info() {
        let client = McpClient::initialize(spec(), paginated_server()).await.unwrap();
        assert_eq!(client.server_info().unwrap().name, "fake-server");
        assert!(client.is_alive());
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let client = McpClient::initialize(spec(), paginated_server()).await.unwrap();
        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "fetch"]);
        assert_eq!(tools[0].input_schema["type"], "object");
    }

    #[tokio::test]
    async fn test_call_tool_returns_result() {
        let client = McpClient::initialize(spec(), paginated_server()).await.unwrap();
        let token = CancellationToken::new();

        let ok = client.call_tool("search", &json!({"q": "x"}), &token).await.unwrap();
        assert!(!ok.is_error);
        assert_eq!(ok.text(), "called search");

        let failed = client.call_tool("fail", &json!({}), &token).await.unwrap();
        assert!(failed.is_error);
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let client = McpClient::initialize(spec(), paginated_server()).await.unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = client.call_tool("search", &json!({}), &token).await.unwrap_err();
        assert!(matches!(err, McpError::Cancelled));
    }

    #[test]
    fn test_spec_from_config() {
        let config: FileProviderServerConfig = toml::from_str(
            r#"
            id = "gh"
            name = "GitHub"
            command = "npx"
            args = ["-y", "server-github"]
            request_timeout_secs = 7
            "#,
        )
        .unwrap();
        let spec = ProviderSpec::from(&config);
        assert_eq!(spec.name, "GitHub");
        assert_eq!(spec.args.len(), 2);
        assert_eq!(spec.request_timeout, Duration::from_secs(7));
    }
}
