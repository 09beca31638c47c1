//! Logging infrastructure - structured turn tracing.
//!
//! Provides [`JsonlTraceSink`], a JSONL file writer that implements
//! the [`TraceSink`](chatflow_application::TraceSink) port.

mod jsonl_trace;

pub use jsonl_trace::JsonlTraceSink;
