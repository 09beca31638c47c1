//! Tool domain module
//!
//! Defines what a tool *is* for one chat turn, independent of where it
//! comes from and how it runs.
//!
//! # Overview
//!
//! Tools reach a turn from three independent [`ToolSourceKind`]s. Each tool
//! is described by a [`ToolDefinition`] (name, description, input schema)
//! plus a [`ToolOrigin`] recording its source. The model proposes
//! [`ToolCall`]s; every call ends in exactly one [`ToolResultRecord`].
//!
//! ```text
//! ToolDefinition + ToolOrigin --> ToolCall (callId) --> ToolResultRecord
//!                                                       success | error | timeout
//! ```
//!
//! # Collision precedence
//!
//! When two sources expose the same name, the higher
//! [`ToolSourceKind::precedence`] wins:
//!
//! | Source | Precedence |
//! |--------|------------|
//! | DefaultToolkit | 2 |
//! | Workflow | 1 |
//! | ExternalProvider | 0 |
//!
//! # Request scoping
//!
//! - [`AllowedProviderSet`](permissions::AllowedProviderSet) filters external
//!   provider tools (fail-closed).
//! - [`Mention`](mention::Mention)s are guidance only and never filter.
//! - [`ToolkitSelection`](toolkit::ToolkitSelection) picks default toolkits.
//!
//! The async execution port lives in the application layer.

pub mod entities;
pub mod mention;
pub mod permissions;
pub mod progress;
pub mod source;
pub mod toolkit;
pub mod validation;
pub mod value_objects;

pub use entities::{ToolCall, ToolDefinition, ToolOrigin, ToolSourceKind};
pub use mention::Mention;
pub use permissions::AllowedProviderSet;
pub use progress::{ProducerTracker, ProgressState, ToolProgress};
pub use source::ToolSourceError;
pub use toolkit::{Toolkit, ToolkitSelection};
pub use validation::{SchemaToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolOutcome, ToolResultRecord};
