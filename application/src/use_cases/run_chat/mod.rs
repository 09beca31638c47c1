//! Run Chat use case
//!
//! One chat turn, end to end:
//!
//! | Phase                         | Frames emitted                  |
//! |-------------------------------|---------------------------------|
//! | 1. Identity / thread checks   | none (errors return early)      |
//! | 2. Registry assembly          | none                            |
//! | 3. Manual confirmation gateway| `start`, `tool-result`          |
//! | 4. Step loop + capture        | `text-delta`, `tool-call`, `tool-progress`, `tool-result` |
//! | 5. Finish                     | `finish` or `error`             |
//! | 6. Persistence                | none (after the stream)         |

mod capture;
mod confirmation;
mod executor;
mod persistence;
mod transcript;
mod types;

pub use types::{ChatError, RunChatInput, RunChatOutput};

use capture::{CaptureLayer, FrameProgressSink};
use chatflow_domain::core::id::{new_message_id, new_thread_id};
use chatflow_domain::core::string::truncate;
use chatflow_domain::{
    ChatMetadata, ChatPromptTemplate, ConversationMessage, ConversationRepository, FinishReason,
    MentionGuidance, Role, SchemaToolValidator, StreamFrame, Thread, ToolValidator,
    ToolkitSelection,
};
use executor::{LoopOutcome, TurnContext, run_steps};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ChatParams;
use crate::ports::chat_progress::{ChatProgressNotifier, NoChatProgress};
use crate::ports::frame_writer::FrameWriter;
use crate::ports::model_backend::ModelBackend;
use crate::ports::tool_executor::ProgressSink;
use crate::ports::trace_sink::{NoTraceSink, TraceEvent, TraceSink, record_quietly};
use crate::use_cases::assemble_tools::{AssembleToolsInput, AssembleToolsUseCase};
use crate::use_cases::shared::{check_cancelled, send_frame};

/// Use case for running one chat turn
pub struct RunChatUseCase<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> {
    backend: Arc<B>,
    repository: Arc<R>,
    assembler: Arc<AssembleToolsUseCase>,
    params: ChatParams,
    trace: Arc<dyn TraceSink>,
    validator: Arc<dyn ToolValidator>,
}

impl<B, R> Clone for RunChatUseCase<B, R>
where
    B: ModelBackend + 'static,
    R: ConversationRepository + ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            repository: self.repository.clone(),
            assembler: self.assembler.clone(),
            params: self.params.clone(),
            trace: self.trace.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> RunChatUseCase<B, R> {
    pub fn new(backend: Arc<B>, repository: Arc<R>, assembler: Arc<AssembleToolsUseCase>) -> Self {
        Self {
            backend,
            repository,
            assembler,
            params: ChatParams::default(),
            trace: Arc::new(NoTraceSink),
            validator: Arc::new(SchemaToolValidator),
        }
    }

    pub fn with_params(mut self, params: ChatParams) -> Self {
        self.params = params;
        self
    }

    /// Set the sink for turn trace events
    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    /// Replace the tool input validator
    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn params(&self) -> &ChatParams {
        &self.params
    }

    pub fn assembler(&self) -> &AssembleToolsUseCase {
        &self.assembler
    }

    /// Run a turn without progress reporting
    pub async fn execute(
        &self,
        input: RunChatInput,
        writer: FrameWriter,
        cancel: CancellationToken,
    ) -> Result<RunChatOutput, ChatError> {
        self.execute_with_progress(input, writer, cancel, &NoChatProgress)
            .await
    }

    /// Run a turn, streaming frames to `writer`.
    ///
    /// Authentication, authorization and request errors are returned before
    /// any frame is written. Once the `start` frame is out, failures are
    /// reported on the stream and the call returns `Ok` with
    /// [`RunChatOutput::error`] set.
    pub async fn execute_with_progress(
        &self,
        input: RunChatInput,
        writer: FrameWriter,
        cancel: CancellationToken,
        progress: &dyn ChatProgressNotifier,
    ) -> Result<RunChatOutput, ChatError> {
        if input.identity.trim().is_empty() {
            return Err(ChatError::Unauthenticated);
        }
        if input.message.as_ref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ChatError::InvalidRequest("message is empty".to_string()));
        }
        if input.message.is_none() && input.thread_id.is_none() {
            return Err(ChatError::InvalidRequest(
                "a continuation needs a thread id".to_string(),
            ));
        }
        check_cancelled(&cancel)?;

        let thread = self.open_thread(&input).await?;
        let mut history = self.repository.load_messages(&thread.id).await?;

        let user_message = input.message.as_ref().map(|text| {
            let message = ConversationMessage::user(&thread.id, text);
            match &input.message_id {
                Some(id) => message.with_id(id),
                None => message,
            }
        });
        let user_message_id = user_message.as_ref().map(|m| m.id.clone());
        let assistant_id =
            persistence::assistant_message_id(new_message_id(), user_message_id.as_deref());

        record_quietly(
            self.trace.as_ref(),
            TraceEvent::new(
                "turn_started",
                json!({
                    "turnId": assistant_id,
                    "threadId": thread.id,
                    "identity": input.identity,
                    "toolChoice": input.tool_choice,
                    "model": input.model,
                    "mentions": input.mentions.len(),
                }),
            ),
        );

        // === Registry assembly ===
        let (toolkits, unknown_toolkits) = ToolkitSelection::from_names(input.toolkits.as_deref());
        for name in &unknown_toolkits {
            warn!(toolkit = %name, "Ignoring unknown toolkit");
        }
        let assembled = self
            .assembler
            .execute(AssembleToolsInput {
                mentions: input.mentions.clone(),
                allowed_providers: input.allowed_provider_tools.clone(),
                toolkits,
                strict: self.params.strict_assembly,
            })
            .await?;
        let registry = assembled.registry;
        progress.on_registry_assembled(registry.len());
        record_quietly(
            self.trace.as_ref(),
            TraceEvent::new(
                "registry_assembled",
                json!({
                    "turnId": assistant_id,
                    "tools": registry.names(),
                    "filteredOut": assembled.report.filtered_out,
                    "collisions": assembled.report.collisions,
                    "failedSources": assembled.report.failed_sources(),
                }),
            ),
        );

        send_frame(
            &writer,
            &cancel,
            StreamFrame::Start {
                thread_id: thread.id.clone(),
                message_id: assistant_id.clone(),
            },
        )
        .await;

        let progress_sink: Arc<dyn ProgressSink> = Arc::new(FrameProgressSink::new(writer.clone()));
        let mut capture = CaptureLayer::new(&assistant_id, self.trace.clone());

        // === Manual confirmation gateway ===
        let mut updated_prior: Option<ConversationMessage> = None;
        if let Some(prior) = history
            .iter_mut()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .filter(|m| m.has_pending_confirmations())
        {
            let report = confirmation::resolve_pending(
                prior,
                &registry,
                self.validator.as_ref(),
                self.params.tool_timeout,
                &cancel,
                progress_sink.clone(),
            )
            .await;
            info!(
                approved = report.approved,
                rejected = report.rejected,
                "Resolved pending tool confirmations"
            );
            capture.emit_results(&report.results, &writer, &cancel).await;
            if report.changed() {
                updated_prior = Some(prior.clone());
            }
        }

        // === Prompt and transcript ===
        let guidance = MentionGuidance::resolve(&input.mentions, &registry.catalog());
        for mention in &guidance.unmatched {
            debug!(mention = %mention.label(), "Mention matches no tool; ignoring");
        }
        let system_prompt = ChatPromptTemplate::system(
            self.params.system_prompt.as_deref(),
            input.agent.as_ref(),
            &guidance,
        );
        let transcript =
            transcript::build_transcript(system_prompt, &history, user_message.as_ref());

        // === Step loop ===
        let ctx = TurnContext {
            backend: self.backend.as_ref(),
            registry: &registry,
            params: &self.params,
            validator: self.validator.as_ref(),
            progress,
            writer: &writer,
            cancel: &cancel,
            progress_sink,
            model: input.model.clone(),
            tool_choice: input.tool_choice,
        };
        let LoopOutcome {
            steps,
            finish_reason,
            usage,
            transport_metadata,
            error: turn_error,
        } = run_steps(&ctx, transcript, &mut capture).await;
        drop(ctx);

        let summary = capture.finish();

        let model = input
            .model
            .clone()
            .unwrap_or_else(|| self.backend.default_model().to_string());
        let mut metadata = ChatMetadata::new(input.tool_choice, registry.len())
            .with_agent_id(input.agent.as_ref().map(|a| a.agent_id.clone()))
            .with_model(model);
        metadata.usage = usage;
        metadata.finish_reason = Some(finish_reason);
        metadata.step_count = steps.len();

        let mut assistant = persistence::build_assistant_message(
            &thread.id,
            assistant_id,
            user_message_id.as_deref(),
            &steps,
            &transport_metadata,
            metadata.clone(),
        );

        // === Finish ===
        let final_frame = match &turn_error {
            None | Some(ChatError::ToolArgument { .. }) => StreamFrame::Finish {
                finish_reason,
                usage,
                metadata,
            },
            Some(e) => StreamFrame::error(e.to_string(), e.is_recoverable()),
        };
        if cancel.is_cancelled() {
            // The consumer may be gone; never wait on it
            let _ = writer.try_send(final_frame);
        } else {
            send_frame(&writer, &cancel, final_frame).await;
        }
        progress.on_turn_end(finish_reason);

        info!(
            thread_id = %thread.id,
            steps = steps.len(),
            finish_reason = %finish_reason,
            tool_calls = summary.call_count,
            "Chat turn finished"
        );
        record_quietly(
            self.trace.as_ref(),
            TraceEvent::new(
                "turn_finished",
                json!({
                    "turnId": assistant.id,
                    "threadId": thread.id,
                    "finishReason": finish_reason,
                    "steps": steps.len(),
                    "usage": usage,
                    "error": turn_error.as_ref().map(|e| e.to_string()),
                }),
            ),
        );

        // === Persistence (after the stream) ===
        assistant.strip_transport_metadata();
        let mut to_save = Vec::with_capacity(3);
        to_save.extend(updated_prior);
        to_save.extend(user_message);
        to_save.push(assistant.clone());

        let persisted = match self.repository.save_messages(&to_save).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    critical = true,
                    reconcile = true,
                    thread_id = %thread.id,
                    message_id = %assistant.id,
                    error = %e,
                    "Failed to persist chat turn"
                );
                record_quietly(
                    self.trace.as_ref(),
                    TraceEvent::new(
                        "persistence_failed",
                        json!({
                            "turnId": assistant.id,
                            "threadId": thread.id,
                            "error": e.to_string(),
                        }),
                    ),
                );
                false
            }
        };

        Ok(RunChatOutput {
            thread_id: thread.id,
            user_message_id,
            assistant_message: assistant,
            finish_reason,
            steps,
            summary,
            persisted,
            error: turn_error.map(|e| e.to_string()),
        })
    }

    /// Resolve the turn's thread, enforcing ownership.
    ///
    /// New threads are created for the caller on first use; continuing a
    /// thread that does not exist is an error.
    async fn open_thread(&self, input: &RunChatInput) -> Result<Thread, ChatError> {
        let Some(thread_id) = &input.thread_id else {
            return self.create_thread(new_thread_id(), input).await;
        };

        match self.repository.get_thread(thread_id).await? {
            Some(thread) if thread.is_owned_by(&input.identity) => Ok(thread),
            Some(_) => {
                warn!(thread_id = %thread_id, "Thread belongs to another identity");
                Err(ChatError::Forbidden {
                    thread_id: thread_id.clone(),
                })
            }
            None if input.message.is_none() => Err(ChatError::ThreadNotFound(thread_id.clone())),
            None => self.create_thread(thread_id.clone(), input).await,
        }
    }

    async fn create_thread(&self, id: String, input: &RunChatInput) -> Result<Thread, ChatError> {
        let mut thread = Thread::new(id, &input.identity);
        if let Some(message) = &input.message {
            thread = thread.with_title(truncate(message.trim(), 60));
        }
        self.repository.create_thread(&thread).await?;
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread)
    }
}
