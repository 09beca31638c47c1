//! Port for structured turn tracing.
//!
//! Defines the [`TraceSink`] trait for recording turn events (registry
//! assembly, completed steps, tool summaries, persistence failures) to a
//! structured trace.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the turn
//! record in a machine-readable format (JSONL).

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Failure to record a trace event. Always swallowed by callers.
#[derive(Error, Debug)]
#[error("Trace sink error: {0}")]
pub struct TraceError(pub String);

/// A structured trace event.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields. Sinks add the timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Event type identifier (e.g., "turn_started", "tool_summary").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl TraceEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording trace events.
///
/// Implementations write each event as a single record (e.g., one JSONL
/// line).
pub trait TraceSink: Send + Sync {
    /// Record a trace event.
    fn record(&self, event: TraceEvent) -> Result<(), TraceError>;
}

/// No-op implementation for tests and when tracing is disabled.
pub struct NoTraceSink;

impl TraceSink for NoTraceSink {
    fn record(&self, _event: TraceEvent) -> Result<(), TraceError> {
        Ok(())
    }
}

/// Record an event, logging and discarding any failure.
pub fn record_quietly(sink: &dyn TraceSink, event: TraceEvent) {
    let event_type = event.event_type;
    if let Err(e) = sink.record(event) {
        warn!(event = event_type, error = %e, "Failed to record trace event");
    }
}
