//! Result capture and reconciliation.
//!
//! After every step each call/result pair is re-emitted as an explicit
//! `tool-result` frame, independent of what the executor retained. The
//! layer also keeps the running [`ToolSummary`] for the turn's trace.

use chatflow_domain::{ExecutionStep, StreamFrame, ToolProgress, ToolResultRecord, ToolSummary};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ports::frame_writer::FrameWriter;
use crate::ports::tool_executor::ProgressSink;
use crate::ports::trace_sink::{TraceEvent, TraceSink, record_quietly};
use crate::use_cases::shared::send_frame;

pub(super) struct CaptureLayer {
    turn_id: String,
    summary: ToolSummary,
    trace: Arc<dyn TraceSink>,
}

impl CaptureLayer {
    pub fn new(turn_id: impl Into<String>, trace: Arc<dyn TraceSink>) -> Self {
        Self {
            turn_id: turn_id.into(),
            summary: ToolSummary::new(),
            trace,
        }
    }

    /// Emit the step's results and fold it into the summary
    pub async fn capture_step(
        &mut self,
        step: &ExecutionStep,
        writer: &FrameWriter,
        cancel: &CancellationToken,
    ) {
        for call in &step.tool_calls {
            match step.result_for(&call.call_id) {
                Some(result) => {
                    send_frame(writer, cancel, StreamFrame::tool_result(result)).await;
                }
                None if step.deferred => {}
                None => {
                    warn!(
                        step = step.index,
                        tool = %call.tool_name,
                        call_id = %call.call_id,
                        "Tool called but no result"
                    );
                }
            }
        }

        for orphan in step.orphan_results() {
            warn!(
                step = step.index,
                tool = %orphan.tool_name,
                call_id = %orphan.call_id,
                "Tool result without a matching call"
            );
            send_frame(writer, cancel, StreamFrame::tool_result(orphan)).await;
        }

        self.summary.record_step(step);

        record_quietly(
            self.trace.as_ref(),
            TraceEvent::new(
                "step_completed",
                json!({
                    "turnId": self.turn_id,
                    "step": step.index,
                    "finishReason": step.finish_reason,
                    "textLength": step.text.len(),
                    "toolCalls": step.tool_calls.len(),
                    "toolResults": step.tool_results.len(),
                    "deferred": step.deferred,
                    "usage": step.usage,
                }),
            ),
        );
    }

    /// Emit results produced outside the loop (confirmed manual calls)
    pub async fn emit_results(
        &self,
        results: &[ToolResultRecord],
        writer: &FrameWriter,
        cancel: &CancellationToken,
    ) {
        for result in results {
            send_frame(writer, cancel, StreamFrame::tool_result(result)).await;
        }
    }

    pub fn summary(&self) -> &ToolSummary {
        &self.summary
    }

    /// Write the turn's tool summary to the trace and hand it back
    pub fn finish(self) -> ToolSummary {
        let summary = self.summary;
        if !summary.unresolved.is_empty() {
            warn!(
                unresolved = ?summary.unresolved,
                "Turn ended with tool calls that never resolved"
            );
        }
        record_quietly(
            self.trace.as_ref(),
            TraceEvent::new(
                "tool_summary",
                json!({
                    "turnId": self.turn_id,
                    "calls": summary.call_count,
                    "results": summary.result_count,
                    "timeouts": summary.timeout_count,
                    "errors": summary.error_count,
                    "deferred": summary.deferred_count,
                    "completionRatio": summary.completion_ratio(),
                    "toolNames": summary.tool_names,
                    "unresolved": summary.unresolved,
                }),
            ),
        );
        summary
    }
}

/// Forwards tool progress as `tool-progress` frames.
///
/// Progress is best effort: when the frame buffer is full the event is
/// dropped rather than stalling the tool.
pub(super) struct FrameProgressSink {
    writer: FrameWriter,
}

impl FrameProgressSink {
    pub fn new(writer: FrameWriter) -> Self {
        Self { writer }
    }
}

impl ProgressSink for FrameProgressSink {
    fn report(&self, progress: ToolProgress) {
        let call_id = progress.tool_call_id.clone();
        if !self.writer.try_send(StreamFrame::ToolProgress(progress)) {
            debug!(call_id = %call_id, "Dropped tool progress frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::frame_writer::frame_channel;
    use crate::ports::trace_sink::TraceError;
    use chatflow_domain::{ProgressState, ToolCall, ToolError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTrace {
        events: Mutex<Vec<&'static str>>,
    }

    impl TraceSink for RecordingTrace {
        fn record(&self, event: TraceEvent) -> Result<(), TraceError> {
            self.events.lock().unwrap().push(event.event_type);
            Ok(())
        }
    }

    fn step_with_results() -> ExecutionStep {
        let mut step = ExecutionStep::new(0);
        step.tool_calls = vec![ToolCall::new("c1", "get_time"), ToolCall::new("c2", "fetch_url")];
        step.tool_results = vec![
            ToolResultRecord::failure("c2", "fetch_url", ToolError::execution_failed("dns")),
            ToolResultRecord::success("c1", "get_time", json!("12:00")),
        ];
        step
    }

    #[tokio::test]
    async fn test_results_emitted_in_call_order() {
        let (writer, stream) = frame_channel(16);
        let cancel = CancellationToken::new();
        let trace = Arc::new(RecordingTrace::default());
        let mut capture = CaptureLayer::new("turn", trace.clone());

        capture
            .capture_step(&step_with_results(), &writer, &cancel)
            .await;
        drop(writer);

        let frames = stream.collect().await;
        let ids: Vec<(String, bool)> = frames
            .iter()
            .filter_map(|f| match f {
                StreamFrame::ToolResult {
                    tool_call_id,
                    is_error,
                    ..
                } => Some((tool_call_id.clone(), *is_error)),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![("c1".into(), false), ("c2".into(), true)]);

        let summary = capture.finish();
        assert_eq!(summary.call_count, 2);
        assert_eq!(summary.result_count, 2);
        assert_eq!(
            *trace.events.lock().unwrap(),
            vec!["step_completed", "tool_summary"]
        );
    }

    #[tokio::test]
    async fn test_orphan_result_still_emitted() {
        let (writer, stream) = frame_channel(16);
        let cancel = CancellationToken::new();
        let mut capture = CaptureLayer::new("turn", Arc::new(RecordingTrace::default()));

        let mut step = ExecutionStep::new(0);
        step.tool_results = vec![ToolResultRecord::success("zz", "get_time", json!(1))];
        capture.capture_step(&step, &writer, &cancel).await;
        drop(writer);

        let frames = stream.collect().await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].type_name(), "tool-result");
    }

    #[tokio::test]
    async fn test_unresolved_call_reported_in_summary() {
        let (writer, _stream) = frame_channel(16);
        let cancel = CancellationToken::new();
        let mut capture = CaptureLayer::new("turn", Arc::new(RecordingTrace::default()));

        let mut step = ExecutionStep::new(0);
        step.tool_calls = vec![ToolCall::new("c1", "get_time")];
        capture.capture_step(&step, &writer, &cancel).await;

        assert_eq!(capture.summary().unresolved, vec!["c1".to_string()]);
        assert!(!capture.finish().is_complete());
    }

    #[tokio::test]
    async fn test_progress_sink_drops_when_full() {
        let (writer, mut stream) = frame_channel(1);
        let sink = FrameProgressSink::new(writer);
        let progress = |seq| ToolProgress {
            tool_call_id: "c1".into(),
            tool_name: "create_bar_chart".into(),
            state: ProgressState::Partial,
            sequence: seq,
            data: json!({}),
        };
        sink.report(progress(1));
        sink.report(progress(2));

        match stream.next().await {
            Some(StreamFrame::ToolProgress(p)) => assert_eq!(p.sequence, 1),
            other => panic!("unexpected {:?}", other),
        }
    }
}
