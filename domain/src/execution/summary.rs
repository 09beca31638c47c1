//! Running summary of tool activity for one turn

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::entities::ExecutionStep;

/// Aggregate of call/result pairs seen by the capture layer.
///
/// Attached to the trace at turn end. `unresolved` lists call ids that were
/// called but never produced a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub call_count: usize,
    pub result_count: usize,
    pub timeout_count: usize,
    pub error_count: usize,
    /// Calls waiting for manual confirmation
    pub deferred_count: usize,
    pub tool_names: BTreeSet<String>,
    pub unresolved: Vec<String>,
}

impl ToolSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one captured step into the summary
    pub fn record_step(&mut self, step: &ExecutionStep) {
        self.call_count += step.tool_calls.len();
        for call in &step.tool_calls {
            self.tool_names.insert(call.tool_name.clone());
        }
        for result in &step.tool_results {
            self.result_count += 1;
            if result.is_timeout() {
                self.timeout_count += 1;
            } else if result.error().is_some() {
                self.error_count += 1;
            }
        }
        if step.deferred {
            self.deferred_count += step.unresolved_calls().count();
        } else {
            self.unresolved
                .extend(step.unresolved_calls().map(|c| c.call_id.clone()));
        }
    }

    pub fn from_steps(steps: &[ExecutionStep]) -> Self {
        let mut summary = Self::new();
        for step in steps {
            summary.record_step(step);
        }
        summary
    }

    /// Fraction of calls that received a result (1.0 when nothing was called)
    pub fn completion_ratio(&self) -> f64 {
        if self.call_count == 0 {
            1.0
        } else {
            self.result_count as f64 / self.call_count as f64
        }
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolCall;
    use crate::tool::value_objects::ToolResultRecord;
    use serde_json::json;

    #[test]
    fn test_summary_counts() {
        let mut step = ExecutionStep::new(0);
        step.tool_calls.push(ToolCall::new("a", "create_bar_chart"));
        step.tool_calls.push(ToolCall::new("b", "http_fetch"));
        step.tool_calls.push(ToolCall::new("c", "http_fetch"));
        step.tool_results
            .push(ToolResultRecord::success("a", "create_bar_chart", json!({})));
        step.tool_results
            .push(ToolResultRecord::timeout("b", "http_fetch", 60_000));

        let summary = ToolSummary::from_steps(&[step]);

        assert_eq!(summary.call_count, 3);
        assert_eq!(summary.result_count, 2);
        assert_eq!(summary.timeout_count, 1);
        assert_eq!(summary.tool_names.len(), 2);
        assert_eq!(summary.unresolved, vec!["c".to_string()]);
        assert!((summary.completion_ratio() - 2.0 / 3.0).abs() < 1e-9);
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_deferred_calls_are_not_unresolved() {
        let mut step = ExecutionStep::new(0);
        step.deferred = true;
        step.tool_calls.push(ToolCall::new("a", "http_fetch"));

        let summary = ToolSummary::from_steps(&[step]);
        assert_eq!(summary.deferred_count, 1);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_empty_summary_is_complete() {
        let summary = ToolSummary::new();
        assert_eq!(summary.completion_ratio(), 1.0);
        assert!(summary.is_complete());
    }
}
