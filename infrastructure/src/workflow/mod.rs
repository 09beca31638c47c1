//! Stored workflows exposed as tools.
//!
//! - [`FileWorkflowStore`]: definitions on disk
//!   ([`WorkflowCatalog`](chatflow_application::WorkflowCatalog))
//! - [`WorkflowEngine`]: sequential node execution with per-node progress
//!   ([`WorkflowRunner`](chatflow_application::WorkflowRunner))
//! - [`WorkflowToolSource`]: one registry entry per workflow

mod definition;
mod runner;
mod source;
mod store;

pub use definition::{NodeAction, WorkflowDefinition, WorkflowNode, render};
pub use runner::WorkflowEngine;
pub use source::WorkflowToolSource;
pub use store::FileWorkflowStore;
