//! Chat session state and turn driver

use super::turn::{TurnSink, stream_turn};
use crate::canvas::CanvasMaterializer;
use crate::output::renderer_for;
use chatflow_application::{
    AssembleToolsInput, AssembledTools, AutoRejectConfirmation, ChatError, ChatProgressNotifier,
    ConfirmationPort, ModelBackend, NoChatProgress, RecordConfirmationUseCase, RunChatInput,
    RunChatOutput, RunChatUseCase,
};
use chatflow_domain::{
    AgentInstructions, AllowedProviderSet, CanvasArtifact, ConversationRepository, Mention,
    OutputFormat, ToolChoiceMode, ToolkitSelection,
};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on confirm-and-continue rounds after one user message
const MAX_CONFIRMATION_ROUNDS: usize = 8;

/// Request settings that persist across the turns of a session
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub identity: String,
    pub thread_id: Option<String>,
    pub model: Option<String>,
    pub tool_choice: ToolChoiceMode,
    pub toolkits: Option<Vec<String>>,
    pub allowed_providers: Option<AllowedProviderSet>,
    pub mentions: Vec<Mention>,
    pub agent: Option<AgentInstructions>,
}

impl ChatSession {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Request for the next turn. `None` continues the thread without a
    /// new user message.
    pub fn input(&self, message: Option<String>) -> RunChatInput {
        RunChatInput {
            identity: self.identity.clone(),
            thread_id: self.thread_id.clone(),
            message,
            message_id: None,
            model: self.model.clone(),
            tool_choice: self.tool_choice,
            toolkits: self.toolkits.clone(),
            allowed_provider_tools: self.allowed_providers.clone(),
            mentions: self.mentions.clone(),
            agent: self.agent.clone(),
        }
    }

    /// Assembly request matching this session's settings
    pub fn assembly_input(&self, strict: bool) -> AssembleToolsInput {
        let (toolkits, unknown) = ToolkitSelection::from_names(self.toolkits.as_deref());
        for name in unknown {
            warn!(toolkit = %name, "Ignoring unknown toolkit");
        }
        AssembleToolsInput {
            mentions: self.mentions.clone(),
            allowed_providers: self.allowed_providers.clone(),
            toolkits,
            strict,
        }
    }

    /// Forget the current thread; the next message starts a new one
    pub fn reset_thread(&mut self) {
        self.thread_id = None;
    }
}

/// Runs turns for a session and handles manual-mode confirmations.
pub struct ChatDriver<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> {
    use_case: RunChatUseCase<B, R>,
    confirmations: RecordConfirmationUseCase<R>,
    confirmation_port: Arc<dyn ConfirmationPort>,
    progress: Arc<dyn ChatProgressNotifier>,
    canvas: Option<CanvasMaterializer>,
    format: OutputFormat,
}

impl<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> ChatDriver<B, R> {
    pub fn new(use_case: RunChatUseCase<B, R>, repository: Arc<R>) -> Self {
        Self {
            use_case,
            confirmations: RecordConfirmationUseCase::new(repository),
            confirmation_port: Arc::new(AutoRejectConfirmation),
            progress: Arc::new(NoChatProgress),
            canvas: None,
            format: OutputFormat::Console,
        }
    }

    /// Set how manual-mode calls are confirmed (default: reject all)
    pub fn with_confirmation_port(mut self, port: Arc<dyn ConfirmationPort>) -> Self {
        self.confirmation_port = port;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ChatProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasMaterializer) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn canvas(&self) -> Option<&CanvasMaterializer> {
        self.canvas.as_ref()
    }

    /// Assemble the registry the session's next turn would see
    pub async fn tools(&self, session: &ChatSession) -> Result<AssembledTools, ChatError> {
        let strict = self.use_case.params().strict_assembly;
        Ok(self
            .use_case
            .assembler()
            .execute(session.assembly_input(strict))
            .await?)
    }

    /// Send a message and run turns until no tool call awaits confirmation.
    ///
    /// The session's thread id is updated from the first turn.
    pub async fn send(
        &self,
        session: &mut ChatSession,
        message: String,
        out: &mut (dyn Write + Send),
    ) -> Result<RunChatOutput, ChatError> {
        let mut output = self.turn(session.input(Some(message)), out).await?;
        session.thread_id = Some(output.thread_id.clone());

        let mut rounds = 0;
        while output.awaiting_confirmation() && rounds < MAX_CONFIRMATION_ROUNDS {
            rounds += 1;
            let registry = self.tools(session).await.ok().map(|t| t.registry);
            let tally = self
                .confirmations
                .ask(
                    &session.identity,
                    &output.thread_id,
                    self.confirmation_port.as_ref(),
                    registry.as_ref(),
                )
                .await?;
            if tally.approved + tally.rejected == 0 {
                break;
            }
            info!(
                approved = tally.approved,
                rejected = tally.rejected,
                "Continuing thread after confirmation"
            );
            output = self.turn(session.input(None), out).await?;
        }

        if output.awaiting_confirmation() {
            warn!(thread_id = %output.thread_id, "Tool calls still await confirmation");
        }
        Ok(output)
    }

    async fn turn(
        &self,
        input: RunChatInput,
        out: &mut (dyn Write + Send),
    ) -> Result<RunChatOutput, ChatError> {
        let mut renderer = renderer_for(self.format);
        let sink = TurnSink {
            renderer: renderer.as_mut(),
            out,
            canvas: self.canvas.as_ref(),
        };
        stream_turn(&self.use_case, input, sink, self.progress.as_ref()).await
    }

    /// Stop the canvas, waiting for in-flight artifacts to settle
    pub async fn finish(self) -> Vec<CanvasArtifact> {
        match self.canvas {
            Some(canvas) => canvas.shutdown().await,
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::turn::test_support::{FixedBackend, MapRepository};
    use chatflow_application::AssembleToolsUseCase;

    #[test]
    fn test_input_carries_session_settings() {
        let mut session = ChatSession::new("alice");
        session.tool_choice = ToolChoiceMode::Manual;
        session.toolkits = Some(vec!["clock".into()]);
        session.thread_id = Some("thread_1".into());

        let input = session.input(Some("hi".into()));
        assert_eq!(input.identity, "alice");
        assert_eq!(input.thread_id.as_deref(), Some("thread_1"));
        assert_eq!(input.tool_choice, ToolChoiceMode::Manual);

        let continuation = session.input(None);
        assert!(continuation.message.is_none());

        session.reset_thread();
        assert!(session.input(None).thread_id.is_none());
    }

    #[test]
    fn test_assembly_input_ignores_unknown_toolkits() {
        let mut session = ChatSession::new("alice");
        session.toolkits = Some(vec!["clock".into(), "teleport".into()]);

        let input = session.assembly_input(false);
        assert_eq!(input.toolkits.toolkits().len(), 1);
    }

    #[tokio::test]
    async fn test_send_remembers_thread() {
        let repository: Arc<dyn ConversationRepository> = Arc::new(MapRepository::default());
        let use_case = RunChatUseCase::new(
            Arc::new(FixedBackend("Hi!")),
            Arc::clone(&repository),
            Arc::new(AssembleToolsUseCase::new()),
        );
        let driver = ChatDriver::new(use_case, repository).with_output_format(OutputFormat::Json);
        let mut session = ChatSession::new("alice");
        let mut out: Vec<u8> = Vec::new();

        let output = driver.send(&mut session, "hello".into(), &mut out).await.unwrap();

        assert_eq!(session.thread_id.as_deref(), Some(output.thread_id.as_str()));
        assert!(!out.is_empty());
        assert!(driver.finish().await.is_empty());
    }
}
