//! Execution domain module
//!
//! Types describing the bounded model loop: [`ExecutionStep`]s, how a turn
//! finished ([`FinishReason`]), token [`Usage`], the request's
//! [`ToolChoiceMode`] and the running [`ToolSummary`] of call/result pairs.

pub mod entities;
pub mod summary;
pub mod value_objects;

pub use entities::ExecutionStep;
pub use summary::ToolSummary;
pub use value_objects::{FinishReason, ToolChoiceMode, Usage};
