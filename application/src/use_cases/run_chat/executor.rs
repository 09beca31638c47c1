//! Step-wise streaming executor.
//!
//! Drives the bounded tool-calling loop: stream one step from the backend,
//! execute (or defer) the requested calls, hand the step to the capture
//! layer, extend the transcript and continue until the backend stops or the
//! step cap is reached.

use chatflow_domain::{
    ExecutionStep, FinishReason, StreamFrame, ToolCall, ToolChoiceMode, ToolError,
    ToolResultRecord, ToolValidator, Usage,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::capture::CaptureLayer;
use super::types::ChatError;
use crate::config::ChatParams;
use crate::ports::chat_progress::ChatProgressNotifier;
use crate::ports::frame_writer::FrameWriter;
use crate::ports::model_backend::{
    BackendError, BackendEvent, ModelBackend, ModelMessage, StepRequest,
};
use crate::ports::tool_executor::{ProgressSink, ToolContext, ToolDescriptor};
use crate::registry::ToolRegistry;
use crate::use_cases::shared::send_frame;
use crate::use_cases::tool_helpers::tool_args_preview;

/// Everything one turn's loop reads from
pub(super) struct TurnContext<'a> {
    pub backend: &'a dyn ModelBackend,
    pub registry: &'a ToolRegistry,
    pub params: &'a ChatParams,
    pub validator: &'a dyn ToolValidator,
    pub progress: &'a dyn ChatProgressNotifier,
    pub writer: &'a FrameWriter,
    pub cancel: &'a CancellationToken,
    pub progress_sink: Arc<dyn ProgressSink>,
    pub model: Option<String>,
    pub tool_choice: ToolChoiceMode,
}

/// Result of running the loop
pub(super) struct LoopOutcome {
    pub steps: Vec<ExecutionStep>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    /// Backend transport metadata by call id
    pub transport_metadata: HashMap<String, Value>,
    /// Error that ended the turn early
    pub error: Option<ChatError>,
}

/// How a single call ended
enum CallOutcome {
    Done(ToolResultRecord),
    NotFound(ToolResultRecord),
    InvalidArguments(ToolResultRecord, String),
    /// The turn was cancelled while the tool ran
    Aborted,
}

/// Run the loop until the backend stops, an error ends the turn or the
/// step cap is reached.
pub(super) async fn run_steps(
    ctx: &TurnContext<'_>,
    mut transcript: Vec<ModelMessage>,
    capture: &mut CaptureLayer,
) -> LoopOutcome {
    let max_steps = ctx.params.max_steps;
    let mut outcome = LoopOutcome {
        steps: Vec::new(),
        finish_reason: FinishReason::StepLimit,
        usage: Usage::default(),
        transport_metadata: HashMap::new(),
        error: None,
    };

    for index in 0..max_steps {
        if ctx.cancel.is_cancelled() {
            outcome.finish_reason = FinishReason::Cancelled;
            break;
        }

        ctx.progress.on_step_start(index, max_steps);
        debug!(step = index, max_steps, "Starting step");

        let request = StepRequest {
            model: ctx.model.clone(),
            messages: transcript.clone(),
            tools: if ctx.tool_choice.offers_tools() {
                ctx.registry.definitions()
            } else {
                Vec::new()
            },
            tool_choice: ctx.tool_choice,
        };

        let mut step = match stream_step(ctx, index, request, &mut outcome.transport_metadata).await
        {
            Ok(step) => step,
            Err(e) => {
                warn!(step = index, error = %e, "Backend step failed");
                outcome.finish_reason = FinishReason::Error;
                outcome.error = Some(ChatError::Backend(e));
                break;
            }
        };
        outcome.usage.add(&step.usage);

        if step.finish_reason == FinishReason::Cancelled {
            capture.capture_step(&step, ctx.writer, ctx.cancel).await;
            outcome.steps.push(step);
            outcome.finish_reason = FinishReason::Cancelled;
            break;
        }

        if !step.has_tool_calls() {
            capture.capture_step(&step, ctx.writer, ctx.cancel).await;
            outcome.finish_reason = step.finish_reason;
            outcome.steps.push(step);
            break;
        }

        if !ctx.tool_choice.executes_immediately() {
            step.deferred = true;
            for call in &step.tool_calls {
                info!(
                    tool = %call.tool_name,
                    call_id = %call.call_id,
                    "Tool call awaiting confirmation"
                );
                ctx.progress.on_tool_deferred(&call.tool_name);
            }
            capture.capture_step(&step, ctx.writer, ctx.cancel).await;
            outcome.steps.push(step);
            outcome.finish_reason = FinishReason::ToolCalls;
            break;
        }

        let halt = execute_calls(ctx, &mut step).await;
        capture.capture_step(&step, ctx.writer, ctx.cancel).await;

        transcript.push(ModelMessage::Assistant {
            text: step.text.clone(),
            tool_calls: step.tool_calls.clone(),
        });
        for result in &step.tool_results {
            transcript.push(ModelMessage::ToolResult {
                call_id: result.call_id.clone(),
                tool_name: result.tool_name.clone(),
                content: result.to_model_content(),
            });
        }
        outcome.steps.push(step);

        if let Some(error) = halt {
            outcome.finish_reason = FinishReason::Error;
            outcome.error = Some(error);
            break;
        }
        if ctx.cancel.is_cancelled() {
            outcome.finish_reason = FinishReason::Cancelled;
            break;
        }
        if index + 1 == max_steps {
            info!(max_steps, "Step limit reached");
            outcome.finish_reason = FinishReason::StepLimit;
        }
    }

    outcome
}

/// Stream one step, forwarding text deltas and tool calls as frames
async fn stream_step(
    ctx: &TurnContext<'_>,
    index: usize,
    request: StepRequest,
    transport: &mut HashMap<String, Value>,
) -> Result<ExecutionStep, BackendError> {
    let mut step = ExecutionStep::new(index);
    let mut stream = ctx.backend.stream_step(request, ctx.cancel.clone()).await?;
    let mut finished = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                step.finish_reason = FinishReason::Cancelled;
                return Ok(step);
            }
            event = stream.receiver.recv() => event,
        };

        match event {
            Some(BackendEvent::TextDelta(delta)) => {
                ctx.progress.on_text_chunk(&delta);
                step.text.push_str(&delta);
                send_frame(ctx.writer, ctx.cancel, StreamFrame::text_delta(delta)).await;
            }
            Some(BackendEvent::ToolCall {
                call,
                provider_metadata,
            }) => {
                if let Some(metadata) = provider_metadata {
                    transport.insert(call.call_id.clone(), metadata);
                }
                send_frame(ctx.writer, ctx.cancel, StreamFrame::tool_call(&call)).await;
                step.tool_calls.push(call);
            }
            Some(BackendEvent::Finish {
                finish_reason,
                usage,
            }) => {
                step.finish_reason = finish_reason;
                step.usage = usage;
                finished = true;
                break;
            }
            Some(BackendEvent::Error(message)) => {
                return Err(BackendError::RequestFailed(message));
            }
            None => break,
        }
    }

    if !finished {
        if ctx.cancel.is_cancelled() {
            step.finish_reason = FinishReason::Cancelled;
            return Ok(step);
        }
        if !step.has_tool_calls() && step.text.is_empty() {
            return Err(BackendError::StreamClosed);
        }
        warn!(step = index, "Backend stream ended without a finish event");
        step.finish_reason = FinishReason::Stop;
    }

    // Tool calls decide whether the loop continues, whatever the backend said
    if step.has_tool_calls() {
        if step.finish_reason != FinishReason::ToolCalls {
            debug!(
                step = index,
                reported = %step.finish_reason,
                "Normalizing finish reason to tool-calls"
            );
        }
        step.finish_reason = FinishReason::ToolCalls;
    } else if step.finish_reason == FinishReason::ToolCalls {
        step.finish_reason = FinishReason::Stop;
    }

    Ok(step)
}

/// Execute every call of a step concurrently and store the results.
///
/// Returns the error that must end the turn, if any.
async fn execute_calls(ctx: &TurnContext<'_>, step: &mut ExecutionStep) -> Option<ChatError> {
    let outcomes =
        futures::future::join_all(step.tool_calls.iter().map(|call| execute_one(ctx, call))).await;

    let mut halt = None;
    for (call, outcome) in step.tool_calls.iter().zip(outcomes) {
        match outcome {
            CallOutcome::Done(record) => step.tool_results.push(record),
            CallOutcome::NotFound(record) => {
                step.tool_results.push(record);
                if !matches!(halt, Some(ChatError::ToolNotFound { .. })) {
                    halt = Some(ChatError::ToolNotFound {
                        name: call.tool_name.clone(),
                        available: ctx.registry.names().into_iter().map(String::from).collect(),
                    });
                }
            }
            CallOutcome::InvalidArguments(record, message) => {
                step.tool_results.push(record);
                if halt.is_none() {
                    halt = Some(ChatError::ToolArgument {
                        name: call.tool_name.clone(),
                        message,
                    });
                }
            }
            CallOutcome::Aborted => {
                debug!(tool = %call.tool_name, call_id = %call.call_id, "Tool call aborted");
            }
        }
    }
    halt
}

async fn execute_one(ctx: &TurnContext<'_>, call: &ToolCall) -> CallOutcome {
    let Some(descriptor) = ctx.registry.get(&call.tool_name) else {
        let available = ctx.registry.names();
        warn!(
            tool = %call.tool_name,
            available = ?available,
            "Model requested a tool that is not in the registry"
        );
        ctx.progress.on_tool_not_found(&call.tool_name, &available);
        return CallOutcome::NotFound(ToolResultRecord::failure(
            &call.call_id,
            &call.tool_name,
            ToolError::unknown_tool(&call.tool_name),
        ));
    };

    if let Err(message) = ctx.validator.validate(call, &descriptor.definition) {
        warn!(tool = %call.tool_name, error = %message, "Tool arguments rejected");
        ctx.progress.on_tool_result(&call.tool_name, false);
        return CallOutcome::InvalidArguments(
            ToolResultRecord::failure(
                &call.call_id,
                &call.tool_name,
                ToolError::invalid_argument(&message),
            ),
            message,
        );
    }

    ctx.progress
        .on_tool_call(&call.tool_name, &tool_args_preview(call));

    match invoke_tool(
        descriptor,
        call,
        ctx.params.tool_timeout,
        ctx.cancel,
        ctx.progress_sink.clone(),
    )
    .await
    {
        Some(record) => {
            ctx.progress
                .on_tool_result(&call.tool_name, record.is_success());
            CallOutcome::Done(record)
        }
        None => CallOutcome::Aborted,
    }
}

/// Invoke a descriptor's executor under the turn's cancellation signal and
/// the per-call timeout.
///
/// Returns `None` when the turn was cancelled before the tool finished.
pub(super) async fn invoke_tool(
    descriptor: &ToolDescriptor,
    call: &ToolCall,
    timeout: Duration,
    cancel: &CancellationToken,
    progress: Arc<dyn ProgressSink>,
) -> Option<ToolResultRecord> {
    let tool_ctx = ToolContext::new(&call.call_id, cancel.child_token(), progress);
    let started = Instant::now();

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = tokio::time::timeout(timeout, descriptor.executor.execute(call, &tool_ctx)) => {
            Some(result)
        }
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let record = match result? {
        Ok(Ok(output)) => {
            debug!(tool = %call.tool_name, elapsed_ms, "Tool succeeded");
            ToolResultRecord::success(&call.call_id, &call.tool_name, output)
                .with_duration(elapsed_ms)
        }
        Ok(Err(error)) => {
            warn!(
                tool = %call.tool_name,
                code = %error.code,
                error = %error.message,
                "Tool failed"
            );
            ToolResultRecord::failure(&call.call_id, &call.tool_name, error)
                .with_duration(elapsed_ms)
        }
        Err(_) => {
            // Tell a still-running tool to stop
            tool_ctx.cancellation.cancel();
            let after_ms = timeout.as_millis() as u64;
            warn!(tool = %call.tool_name, after_ms, "Tool timed out");
            ToolResultRecord::timeout(&call.call_id, &call.tool_name, after_ms)
        }
    };
    Some(record)
}
