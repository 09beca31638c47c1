//! Per-turn tool registry
//!
//! The [`ToolRegistry`] is the flat name → [`ToolDescriptor`] map a turn
//! runs against. It is built once by the assembler and never mutated
//! afterwards, so a turn keeps its snapshot even if a source refreshes.
//!
//! # Collision precedence
//!
//! When two sources offer the same name the descriptor whose origin has the
//! higher [`ToolSourceKind::precedence`] is kept. Equal precedence keeps the
//! first one inserted.

use std::collections::BTreeMap;

use chatflow_domain::{ToolCatalogEntry, ToolDefinition, ToolSourceKind};

use crate::ports::tool_executor::ToolDescriptor;

/// What happened when a descriptor was inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    /// Replaced an entry from a lower-precedence source
    Replaced { previous: ToolSourceKind },
    /// Kept the existing entry from a higher-or-equal precedence source
    Shadowed { kept: ToolSourceKind },
}

/// Immutable-after-assembly map of tools for one turn
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor under collision precedence
    pub fn insert(&mut self, descriptor: ToolDescriptor) -> InsertOutcome {
        let name = descriptor.definition.name.clone();
        let incoming = descriptor.origin.kind();

        match self.tools.get(&name) {
            None => {
                self.tools.insert(name, descriptor);
                InsertOutcome::Added
            }
            Some(existing) => {
                let current = existing.origin.kind();
                if incoming.precedence() > current.precedence() {
                    self.tools.insert(name, descriptor);
                    InsertOutcome::Replaced { previous: current }
                } else {
                    InsertOutcome::Shadowed { kept: current }
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|k| k.as_str()).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Schema-only view offered to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|d| d.definition.clone()).collect()
    }

    /// Name/origin view used to match mentions
    pub fn catalog(&self) -> Vec<ToolCatalogEntry<'_>> {
        self.tools
            .values()
            .map(|d| ToolCatalogEntry {
                name: &d.definition.name,
                origin: &d.origin,
            })
            .collect()
    }

    /// Number of tools per source kind
    pub fn count_by_kind(&self, kind: ToolSourceKind) -> usize {
        self.tools
            .values()
            .filter(|d| d.origin.kind() == kind)
            .count()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ports::tool_executor::{ToolContext, ToolExecutor};
    use async_trait::async_trait;
    use chatflow_domain::{ToolCall, ToolError, ToolOrigin, Toolkit};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor that echoes its input and counts invocations
    #[derive(Default)]
    pub struct EchoExecutor {
        pub calls: AtomicUsize,
    }

    impl EchoExecutor {
        pub fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "echo": call.input }))
        }
    }

    pub fn default_origin() -> ToolOrigin {
        ToolOrigin::DefaultToolkit {
            toolkit: Toolkit::Clock,
        }
    }

    pub fn provider_origin(provider_id: &str, remote: &str) -> ToolOrigin {
        ToolOrigin::ExternalProvider {
            provider_id: provider_id.to_string(),
            provider_name: provider_id.to_string(),
            remote_tool_name: remote.to_string(),
        }
    }

    pub fn workflow_origin(workflow_id: &str) -> ToolOrigin {
        ToolOrigin::Workflow {
            workflow_id: workflow_id.to_string(),
            workflow_name: workflow_id.to_string(),
        }
    }

    pub fn descriptor(name: &str, origin: ToolOrigin) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolDefinition::new(name, format!("{} tool", name)),
            origin,
            Arc::new(EchoExecutor::default()),
        )
    }

    pub fn descriptor_with(
        name: &str,
        origin: ToolOrigin,
        executor: Arc<dyn ToolExecutor>,
    ) -> ToolDescriptor {
        ToolDescriptor::new(
            ToolDefinition::new(name, format!("{} tool", name)),
            origin,
            executor,
        )
    }
}
