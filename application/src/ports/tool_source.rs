//! Tool source port
//!
//! A tool source contributes zero or more [`ToolDescriptor`]s to a turn.
//! Sources are resolved fresh per request and independently of each other.

use async_trait::async_trait;
use chatflow_domain::{
    AllowedProviderSet, Mention, ToolSourceError, ToolSourceKind, ToolkitSelection,
};

use super::tool_executor::ToolDescriptor;

/// What a source needs to know about the request
#[derive(Debug, Clone, Default)]
pub struct SourceRequest {
    pub toolkits: ToolkitSelection,
    /// Providers the request may use. Sources can use this to skip work;
    /// the assembler still filters authoritatively.
    pub allowed_providers: Option<AllowedProviderSet>,
    pub mentions: Vec<Mention>,
}

/// Port for one of the three tool sources
#[async_trait]
pub trait ToolSourcePort: Send + Sync {
    fn kind(&self) -> ToolSourceKind;

    /// Resolve the descriptors this source offers for a request
    async fn resolve(
        &self,
        request: &SourceRequest,
    ) -> Result<Vec<ToolDescriptor>, ToolSourceError>;
}
