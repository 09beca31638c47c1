//! Assemble Tools use case
//!
//! Builds the per-turn [`ToolRegistry`] from every configured tool source.
//!
//! ```text
//! ExternalProvider ──resolve──▶ AllowedProviderSet filter ─┐
//! Workflow ─────────resolve────────────────────────────────┼──▶ merge ──▶ ToolRegistry
//! DefaultToolkit ───resolve────────────────────────────────┘  (precedence)
//! ```
//!
//! Sources are resolved concurrently. A source that errors (or panics)
//! contributes nothing and the others are unaffected. Only in strict mode is
//! a source error returned to the caller. Mentions are passed through to the
//! sources but never remove entries.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chatflow_domain::{
    AllowedProviderSet, Mention, ToolOrigin, ToolSourceError, ToolSourceKind, ToolkitSelection,
};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::ports::tool_executor::ToolDescriptor;
use crate::ports::tool_source::{SourceRequest, ToolSourcePort};
use crate::registry::{InsertOutcome, ToolRegistry};

/// Errors surfaced only in strict mode
#[derive(Error, Debug)]
pub enum AssembleToolsError {
    #[error(transparent)]
    Source(#[from] ToolSourceError),

    #[error("{0} source panicked during resolution")]
    SourcePanicked(ToolSourceKind),
}

/// Input for the AssembleTools use case
#[derive(Debug, Clone, Default)]
pub struct AssembleToolsInput {
    pub mentions: Vec<Mention>,
    /// `None` means no external-provider tools at all
    pub allowed_providers: Option<AllowedProviderSet>,
    pub toolkits: ToolkitSelection,
    pub strict: bool,
}

/// Per-source result of an assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Resolved { offered: usize, kept: usize },
    Failed { message: String },
}

/// Diagnostics of an assembly, useful for traces and `--list-tools`
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    pub sources: Vec<(ToolSourceKind, SourceStatus)>,
    /// Provider tools removed by the permission set
    pub filtered_out: usize,
    /// Names whose descriptor came from a higher-precedence source
    pub collisions: Vec<String>,
}

impl AssemblyReport {
    /// Sources that contributed nothing because they failed
    pub fn failed_sources(&self) -> Vec<ToolSourceKind> {
        self.sources
            .iter()
            .filter(|(_, status)| matches!(status, SourceStatus::Failed { .. }))
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Output of the AssembleTools use case
#[derive(Debug, Clone, Default)]
pub struct AssembledTools {
    pub registry: ToolRegistry,
    pub report: AssemblyReport,
}

/// Use case for assembling the merged tool registry
#[derive(Clone, Default)]
pub struct AssembleToolsUseCase {
    sources: Vec<Arc<dyn ToolSourcePort>>,
}

impl AssembleToolsUseCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool source
    pub fn with_source(mut self, source: Arc<dyn ToolSourcePort>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Assemble the registry.
    ///
    /// In non-strict mode this never fails: failed sources are logged and
    /// skipped.
    pub async fn execute(
        &self,
        input: AssembleToolsInput,
    ) -> Result<AssembledTools, AssembleToolsError> {
        let request = SourceRequest {
            toolkits: input.toolkits.clone(),
            allowed_providers: input.allowed_providers.clone(),
            mentions: input.mentions.clone(),
        };

        let resolutions = futures::future::join_all(self.sources.iter().map(|source| {
            let kind = source.kind();
            let request = &request;
            async move {
                let outcome = AssertUnwindSafe(source.resolve(request))
                    .catch_unwind()
                    .await;
                (kind, outcome)
            }
        }))
        .await;

        let mut report = AssemblyReport::default();
        let mut accepted: Vec<(ToolSourceKind, Vec<ToolDescriptor>)> = Vec::new();

        for (kind, outcome) in resolutions {
            match outcome {
                Ok(Ok(descriptors)) => {
                    let offered = descriptors.len();
                    let kept: Vec<ToolDescriptor> = descriptors
                        .into_iter()
                        .filter(|d| permitted(d, input.allowed_providers.as_ref()))
                        .collect();
                    report.filtered_out += offered - kept.len();
                    report.sources.push((
                        kind,
                        SourceStatus::Resolved {
                            offered,
                            kept: kept.len(),
                        },
                    ));
                    accepted.push((kind, kept));
                }
                Ok(Err(e)) => {
                    if input.strict {
                        return Err(e.into());
                    }
                    warn!(source = %kind, error = %e, "Tool source failed; continuing without it");
                    report.sources.push((
                        kind,
                        SourceStatus::Failed {
                            message: e.to_string(),
                        },
                    ));
                }
                Err(_) => {
                    if input.strict {
                        return Err(AssembleToolsError::SourcePanicked(kind));
                    }
                    warn!(source = %kind, "Tool source panicked; continuing without it");
                    report.sources.push((
                        kind,
                        SourceStatus::Failed {
                            message: "panicked".to_string(),
                        },
                    ));
                }
            }
        }

        let mut registry = ToolRegistry::new();
        for (kind, descriptors) in accepted {
            for descriptor in descriptors {
                if descriptor.definition.name.trim().is_empty() {
                    debug!(source = %kind, "Skipping tool with empty name");
                    continue;
                }
                let name = descriptor.definition.name.clone();
                match registry.insert(descriptor) {
                    InsertOutcome::Added => {
                        trace!(tool = %name, source = %kind, "Registered tool");
                    }
                    InsertOutcome::Replaced { previous } => {
                        debug!(
                            tool = %name,
                            source = %kind,
                            replaced = %previous,
                            "Tool name collision"
                        );
                        report.collisions.push(name);
                    }
                    InsertOutcome::Shadowed { kept } => {
                        debug!(tool = %name, source = %kind, kept = %kept, "Tool name collision");
                        report.collisions.push(name);
                    }
                }
            }
        }

        info!(
            tools = registry.len(),
            filtered_out = report.filtered_out,
            mentions = input.mentions.len(),
            "Assembled tool registry"
        );

        Ok(AssembledTools { registry, report })
    }
}

/// Fail-closed permission check. Only provider tools are filtered.
fn permitted(descriptor: &ToolDescriptor, allowed: Option<&AllowedProviderSet>) -> bool {
    match &descriptor.origin {
        ToolOrigin::ExternalProvider {
            provider_id,
            remote_tool_name,
            ..
        } => allowed.is_some_and(|set| {
            set.permits(provider_id, remote_tool_name)
                || set.permits(provider_id, &descriptor.definition.name)
        }),
        _ => true,
    }
}
