//! Record Confirmation use case
//!
//! Between manual-mode turns the host collects the user's decisions on the
//! pending tool calls of a thread's last assistant message and stores them
//! on the parts. The next turn's gateway acts on them.

use chatflow_domain::{ConversationMessage, ConversationRepository, ToolCall, ToolPartState};
use std::sync::Arc;
use tracing::{info, warn};

use crate::ports::confirmation::{ConfirmationError, ConfirmationPort};
use crate::registry::ToolRegistry;
use crate::use_cases::run_chat::ChatError;

/// Counts of recorded decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmationTally {
    pub approved: usize,
    pub rejected: usize,
}

/// Use case for recording decisions on pending tool calls
pub struct RecordConfirmationUseCase<R: ConversationRepository + ?Sized + 'static> {
    repository: Arc<R>,
}

impl<R: ConversationRepository + ?Sized + 'static> RecordConfirmationUseCase<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Tool calls of the last assistant message still awaiting a decision
    pub async fn pending(
        &self,
        identity: &str,
        thread_id: &str,
    ) -> Result<Vec<ToolCall>, ChatError> {
        let Some(message) = self.last_assistant(identity, thread_id).await? else {
            return Ok(Vec::new());
        };
        Ok(message.awaiting_confirmation().map(|p| p.to_call()).collect())
    }

    /// Store explicit decisions by call id. Unknown ids are ignored.
    pub async fn record(
        &self,
        identity: &str,
        thread_id: &str,
        decisions: &[(String, bool)],
    ) -> Result<ConfirmationTally, ChatError> {
        let Some(mut message) = self.last_assistant(identity, thread_id).await? else {
            return Ok(ConfirmationTally::default());
        };

        let mut tally = ConfirmationTally::default();
        for (call_id, approved) in decisions {
            match message.tool_part_mut(call_id) {
                Some(part) if part.state == ToolPartState::AwaitingConfirmation => {
                    part.record_decision(*approved);
                    count(&mut tally, *approved);
                }
                _ => warn!(call_id = %call_id, "No pending tool call with this id"),
            }
        }

        self.save(message, tally).await
    }

    /// Ask `port` about every pending call and store the answers.
    ///
    /// A failure to ask counts as a rejection for that call and every call
    /// after it.
    pub async fn ask(
        &self,
        identity: &str,
        thread_id: &str,
        port: &dyn ConfirmationPort,
        registry: Option<&ToolRegistry>,
    ) -> Result<ConfirmationTally, ChatError> {
        let Some(mut message) = self.last_assistant(identity, thread_id).await? else {
            return Ok(ConfirmationTally::default());
        };

        let calls: Vec<ToolCall> = message.awaiting_confirmation().map(|p| p.to_call()).collect();
        let mut tally = ConfirmationTally::default();
        let mut aborted = false;

        for call in calls {
            let approved = if aborted {
                false
            } else {
                let definition = registry
                    .and_then(|r| r.get(&call.tool_name))
                    .map(|d| &d.definition);
                match port.confirm(&call, definition).await {
                    Ok(approved) => approved,
                    Err(ConfirmationError::Cancelled) => {
                        info!("Confirmation cancelled; rejecting remaining calls");
                        aborted = true;
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "Confirmation failed; rejecting remaining calls");
                        aborted = true;
                        false
                    }
                }
            };

            if let Some(part) = message.tool_part_mut(&call.call_id) {
                part.record_decision(approved);
                count(&mut tally, approved);
            }
        }

        self.save(message, tally).await
    }

    async fn last_assistant(
        &self,
        identity: &str,
        thread_id: &str,
    ) -> Result<Option<ConversationMessage>, ChatError> {
        if identity.trim().is_empty() {
            return Err(ChatError::Unauthenticated);
        }
        let thread = self
            .repository
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| ChatError::ThreadNotFound(thread_id.to_string()))?;
        if !thread.is_owned_by(identity) {
            return Err(ChatError::Forbidden {
                thread_id: thread_id.to_string(),
            });
        }
        Ok(self
            .repository
            .last_assistant_message(thread_id)
            .await?
            .filter(|m| m.has_pending_confirmations()))
    }

    async fn save(
        &self,
        message: ConversationMessage,
        tally: ConfirmationTally,
    ) -> Result<ConfirmationTally, ChatError> {
        if tally.approved + tally.rejected > 0 {
            self.repository.save_messages(&[message]).await?;
            info!(
                approved = tally.approved,
                rejected = tally.rejected,
                "Recorded tool call decisions"
            );
        }
        Ok(tally)
    }
}

fn count(tally: &mut ConfirmationTally, approved: bool) {
    if approved {
        tally.approved += 1;
    } else {
        tally.rejected += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::confirmation::{AutoApproveConfirmation, AutoRejectConfirmation};
    use async_trait::async_trait;
    use chatflow_domain::{
        MessagePart, RepositoryError, Thread, ToolDefinition, ToolInvocationPart,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct SingleThreadRepo {
        thread: Mutex<Option<Thread>>,
        messages: Mutex<Vec<ConversationMessage>>,
    }

    #[async_trait]
    impl ConversationRepository for SingleThreadRepo {
        async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, RepositoryError> {
            Ok(self
                .thread
                .lock()
                .unwrap()
                .clone()
                .filter(|t| t.id == thread_id))
        }

        async fn create_thread(&self, thread: &Thread) -> Result<(), RepositoryError> {
            *self.thread.lock().unwrap() = Some(thread.clone());
            Ok(())
        }

        async fn load_messages(
            &self,
            _thread_id: &str,
        ) -> Result<Vec<ConversationMessage>, RepositoryError> {
            Ok(self.messages.lock().unwrap().clone())
        }

        async fn save_messages(
            &self,
            messages: &[ConversationMessage],
        ) -> Result<(), RepositoryError> {
            let mut stored = self.messages.lock().unwrap();
            for message in messages {
                match stored.iter_mut().find(|m| m.id == message.id) {
                    Some(existing) => *existing = message.clone(),
                    None => stored.push(message.clone()),
                }
            }
            Ok(())
        }
    }

    async fn repo_with_pending(calls: &[&str]) -> Arc<SingleThreadRepo> {
        let repo = Arc::new(SingleThreadRepo::default());
        repo.create_thread(&Thread::new("t1", "alice")).await.unwrap();
        let mut message = ConversationMessage::assistant("t1").with_id("a1");
        for id in calls {
            let mut part = ToolInvocationPart::from_call(&ToolCall::new(*id, "fetch_url"));
            part.state = ToolPartState::AwaitingConfirmation;
            message.parts.push(MessagePart::ToolCall(part));
        }
        repo.save_messages(&[message]).await.unwrap();
        repo
    }

    fn decision(repo: &SingleThreadRepo, call_id: &str) -> Option<bool> {
        let mut messages = repo.messages.lock().unwrap();
        messages[0]
            .tool_part_mut(call_id)
            .and_then(|p| p.confirmation_decision())
    }

    #[tokio::test]
    async fn test_pending_lists_calls() {
        let repo = repo_with_pending(&["c1", "c2"]).await;
        let use_case = RecordConfirmationUseCase::new(repo);
        let pending = use_case.pending("alice", "t1").await.unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn test_record_explicit_decisions() {
        let repo = repo_with_pending(&["c1", "c2"]).await;
        let use_case = RecordConfirmationUseCase::new(repo.clone());

        let tally = use_case
            .record("alice", "t1", &[("c1".into(), true), ("zz".into(), true)])
            .await
            .unwrap();

        assert_eq!(tally, ConfirmationTally { approved: 1, rejected: 0 });
        assert_eq!(decision(&repo, "c1"), Some(true));
        assert_eq!(decision(&repo, "c2"), None);
    }

    #[tokio::test]
    async fn test_ask_with_auto_ports() {
        let repo = repo_with_pending(&["c1", "c2"]).await;
        let use_case = RecordConfirmationUseCase::new(repo.clone());

        let tally = use_case
            .ask("alice", "t1", &AutoRejectConfirmation, None)
            .await
            .unwrap();
        assert_eq!(tally.rejected, 2);
        assert_eq!(decision(&repo, "c2"), Some(false));

        // Decisions can be changed until the next turn runs
        let tally = use_case
            .ask("alice", "t1", &AutoApproveConfirmation, None)
            .await
            .unwrap();
        assert_eq!(tally.approved, 2);
        assert_eq!(decision(&repo, "c1"), Some(true));
    }

    #[tokio::test]
    async fn test_cancelled_prompt_rejects_rest() {
        struct CancelOnFirst;

        #[async_trait]
        impl ConfirmationPort for CancelOnFirst {
            async fn confirm(
                &self,
                _call: &ToolCall,
                _definition: Option<&ToolDefinition>,
            ) -> Result<bool, ConfirmationError> {
                Err(ConfirmationError::Cancelled)
            }
        }

        let repo = repo_with_pending(&["c1", "c2"]).await;
        let use_case = RecordConfirmationUseCase::new(repo.clone());
        let tally = use_case.ask("alice", "t1", &CancelOnFirst, None).await.unwrap();

        assert_eq!(tally.rejected, 2);
        assert_eq!(decision(&repo, "c1"), Some(false));
    }

    #[tokio::test]
    async fn test_other_identity_forbidden() {
        let repo = repo_with_pending(&["c1"]).await;
        let use_case = RecordConfirmationUseCase::new(repo);
        let err = use_case.pending("bob", "t1").await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
