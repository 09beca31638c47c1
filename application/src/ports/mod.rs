//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod chat_progress;
pub mod confirmation;
pub mod frame_writer;
pub mod model_backend;
pub mod tool_executor;
pub mod tool_source;
pub mod trace_sink;
pub mod workflow;
