//! Default toolkit source
//!
//! Statically registered in-process tools, grouped by [`Toolkit`]. The
//! request's [`ToolkitSelection`](chatflow_domain::ToolkitSelection) decides
//! which groups are offered.

use super::clock::{CurrentTimeTool, ShiftTimeTool, current_time_definition, shift_time_definition};
use super::http::{FetchUrlTool, fetch_url_definition};
use super::visualization::{VisualKind, VisualizationTool};
use async_trait::async_trait;
use chatflow_application::{SourceRequest, ToolDescriptor, ToolExecutor, ToolSourcePort};
use chatflow_domain::{ToolDefinition, ToolOrigin, ToolSourceError, ToolSourceKind, Toolkit};
use std::sync::Arc;
use std::time::Duration;

/// Connect timeout for the http toolkit's client
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DefaultToolkitSource {
    http_client: reqwest::Client,
}

impl DefaultToolkitSource {
    pub fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_http_client(http_client)
    }

    pub fn with_http_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Every tool of one toolkit
    pub fn toolkit_tools(&self, toolkit: Toolkit) -> Vec<ToolDescriptor> {
        match toolkit {
            Toolkit::Visualization => VisualKind::ALL
                .into_iter()
                .map(|kind| {
                    let tool = Arc::new(VisualizationTool::new(kind));
                    descriptor(toolkit, kind.definition(), tool)
                })
                .collect(),
            Toolkit::Http => vec![descriptor(
                toolkit,
                fetch_url_definition(),
                Arc::new(FetchUrlTool::new(self.http_client.clone())),
            )],
            Toolkit::Clock => vec![
                descriptor(toolkit, current_time_definition(), Arc::new(CurrentTimeTool)),
                descriptor(toolkit, shift_time_definition(), Arc::new(ShiftTimeTool)),
            ],
        }
    }
}

fn descriptor(
    toolkit: Toolkit,
    definition: ToolDefinition,
    executor: Arc<dyn ToolExecutor>,
) -> ToolDescriptor {
    ToolDescriptor::new(definition, ToolOrigin::DefaultToolkit { toolkit }, executor)
}

impl Default for DefaultToolkitSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolSourcePort for DefaultToolkitSource {
    fn kind(&self) -> ToolSourceKind {
        ToolSourceKind::DefaultToolkit
    }

    async fn resolve(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<ToolDescriptor>, ToolSourceError> {
        Ok(request
            .toolkits
            .toolkits()
            .into_iter()
            .flat_map(|toolkit| self.toolkit_tools(toolkit))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::ToolkitSelection;

    #[tokio::test]
    async fn test_all_toolkits_by_default() {
        let source = DefaultToolkitSource::new();
        let tools = source.resolve(&SourceRequest::default()).await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();

        let expected_tools = [
            "create_bar_chart",
            "create_table",
            "fetch_url",
            "current_time",
            "shift_time",
        ];
        for expected in expected_tools {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert!(tools.iter().all(|t| t.origin.kind() == ToolSourceKind::DefaultToolkit));
    }

    #[tokio::test]
    async fn test_selection_limits_toolkits() {
        let source = DefaultToolkitSource::new();
        let request = SourceRequest {
            toolkits: ToolkitSelection::Only(vec![Toolkit::Clock]),
            ..Default::default()
        };
        let tools = source.resolve(&request).await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["current_time", "shift_time"]);
    }
}
