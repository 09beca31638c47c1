//! Progressive tool producers
//!
//! Some tools (charts, workflows) emit intermediate states before their final
//! result. The lifecycle is an explicit state machine:
//!
//! ```text
//! Idle ──pending──▶ Pending ──partial──▶ Partial ──partial──▶ Partial
//!   │                  │                    │
//!   └──────────────────┴──────finish────────┴──────▶ Finished
//! ```
//!
//! [`ProducerTracker`] enforces the order; the resulting [`ToolProgress`]
//! values are handed to a progress callback by the application layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Intermediate state reported by a producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Pending,
    Partial,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Pending => "pending",
            ProgressState::Partial => "partial",
        }
    }
}

/// One intermediate progress event for a running tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProgress {
    pub tool_call_id: String,
    pub tool_name: String,
    pub state: ProgressState,
    /// Monotonic per-call counter starting at 0
    pub sequence: u32,
    /// Producer-defined payload (partial chart data, workflow node info, ...)
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerPhase {
    Idle,
    Pending,
    Partial,
    Finished,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid progress transition for call {call_id}: {from:?} -> {to}")]
pub struct ProgressTransitionError {
    pub call_id: String,
    pub from: ProducerPhase,
    pub to: &'static str,
}

/// Enforces `pending → partial* → finished` for a single tool call.
#[derive(Debug, Clone)]
pub struct ProducerTracker {
    tool_call_id: String,
    tool_name: String,
    phase: ProducerPhase,
    sequence: u32,
}

impl ProducerTracker {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            phase: ProducerPhase::Idle,
            sequence: 0,
        }
    }

    pub fn phase(&self) -> ProducerPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ProducerPhase::Finished
    }

    /// Announce that the producer has started. Only valid once, first.
    pub fn pending(&mut self, data: Value) -> Result<ToolProgress, ProgressTransitionError> {
        if self.phase != ProducerPhase::Idle {
            return Err(self.invalid("pending"));
        }
        self.phase = ProducerPhase::Pending;
        Ok(self.emit(ProgressState::Pending, data))
    }

    /// Report an intermediate result. An implicit `pending` is emitted first
    /// by callers that skip it, so `Idle` is accepted here too.
    pub fn partial(&mut self, data: Value) -> Result<ToolProgress, ProgressTransitionError> {
        if self.phase == ProducerPhase::Finished {
            return Err(self.invalid("partial"));
        }
        self.phase = ProducerPhase::Partial;
        Ok(self.emit(ProgressState::Partial, data))
    }

    /// Mark the producer terminal. The terminal value itself travels as the
    /// tool result, not as a progress event.
    pub fn finish(&mut self) -> Result<(), ProgressTransitionError> {
        if self.phase == ProducerPhase::Finished {
            return Err(self.invalid("finished"));
        }
        self.phase = ProducerPhase::Finished;
        Ok(())
    }

    fn emit(&mut self, state: ProgressState, data: Value) -> ToolProgress {
        let progress = ToolProgress {
            tool_call_id: self.tool_call_id.clone(),
            tool_name: self.tool_name.clone(),
            state,
            sequence: self.sequence,
            data,
        };
        self.sequence += 1;
        progress
    }

    fn invalid(&self, to: &'static str) -> ProgressTransitionError {
        ProgressTransitionError {
            call_id: self.tool_call_id.clone(),
            from: self.phase,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pending_partial_finish() {
        let mut tracker = ProducerTracker::new("call_1", "create_line_chart");

        let first = tracker.pending(json!({"id": "X"})).unwrap();
        assert_eq!(first.state, ProgressState::Pending);
        assert_eq!(first.sequence, 0);

        let second = tracker.partial(json!({"points": 10})).unwrap();
        let third = tracker.partial(json!({"points": 20})).unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(third.sequence, 2);
        assert_eq!(tracker.phase(), ProducerPhase::Partial);

        tracker.finish().unwrap();
        assert!(tracker.is_finished());
    }

    #[test]
    fn test_no_events_after_finish() {
        let mut tracker = ProducerTracker::new("call_1", "t");
        tracker.finish().unwrap();

        assert!(tracker.partial(json!(null)).is_err());
        assert!(tracker.finish().is_err());
    }

    #[test]
    fn test_pending_only_once() {
        let mut tracker = ProducerTracker::new("call_1", "t");
        tracker.pending(json!(null)).unwrap();
        let err = tracker.pending(json!(null)).unwrap_err();
        assert_eq!(err.from, ProducerPhase::Pending);
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let mut tracker = ProducerTracker::new("call_9", "t");
        let event = tracker.partial(json!({"n": 1})).unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["toolCallId"], "call_9");
        assert_eq!(value["state"], "partial");
    }
}
