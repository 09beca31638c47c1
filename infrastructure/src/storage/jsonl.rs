//! JSONL conversation repository.
//!
//! Each thread lives in `<dir>/<thread_id>.jsonl`. The first line is the
//! thread record, every following line one message in insertion order:
//!
//! ```text
//! {"record":"thread","id":"thread_1","ownerId":"alice","createdAt":"..."}
//! {"record":"message","id":"msg_1","threadId":"thread_1","role":"user","parts":[...]}
//! ```
//!
//! Saving rewrites the file through a temporary sibling and a rename, so a
//! crash leaves either the old or the new history.

use super::{by_thread, upsert};
use async_trait::async_trait;
use chatflow_domain::{ConversationMessage, ConversationRepository, RepositoryError, Thread};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Thread(Thread),
    Message(ConversationMessage),
}

/// File-per-thread repository
pub struct JsonlConversationRepository {
    dir: PathBuf,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonlConversationRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, thread_id: &str) -> Result<PathBuf, RepositoryError> {
        let valid = !thread_id.is_empty()
            && !thread_id.starts_with('.')
            && thread_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(RepositoryError::Io(format!(
                "invalid thread id: {:?}",
                thread_id
            )));
        }
        Ok(self.dir.join(format!("{}.jsonl", thread_id)))
    }

    /// Thread record and messages, or `None` if the file does not exist
    async fn read_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<(Thread, Vec<ConversationMessage>)>, RepositoryError> {
        let path = self.path_for(thread_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let mut thread = None;
        let mut messages = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(line).map_err(|e| {
                RepositoryError::Serialization(format!(
                    "{} line {}: {}",
                    path.display(),
                    index + 1,
                    e
                ))
            })?;
            match record {
                Record::Thread(t) if thread.is_none() => thread = Some(t),
                Record::Thread(_) => {
                    warn!(
                        path = %path.display(),
                        line = index + 1,
                        "Ignoring repeated thread record"
                    )
                }
                Record::Message(m) => messages.push(m),
            }
        }

        let thread = thread.ok_or_else(|| {
            RepositoryError::Serialization(format!("{}: missing thread record", path.display()))
        })?;
        Ok(Some((thread, messages)))
    }

    async fn write_thread(
        &self,
        thread: &Thread,
        messages: &[ConversationMessage],
    ) -> Result<(), RepositoryError> {
        let path = self.path_for(&thread.id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let mut content = encode(&Record::Thread(thread.clone()))?;
        for message in messages {
            content.push_str(&encode(&Record::Message(message.clone()))?);
        }

        let tmp = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        debug!(thread_id = %thread.id, messages = messages.len(), "Wrote thread");
        Ok(())
    }
}

fn encode(record: &Record) -> Result<String, RepositoryError> {
    let mut line =
        serde_json::to_string(record).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

fn io_error(path: &Path, e: std::io::Error) -> RepositoryError {
    RepositoryError::Io(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl ConversationRepository for JsonlConversationRepository {
    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>, RepositoryError> {
        Ok(self.read_thread(thread_id).await?.map(|(thread, _)| thread))
    }

    async fn create_thread(&self, thread: &Thread) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if self.read_thread(&thread.id).await?.is_some() {
            return Ok(());
        }
        self.write_thread(thread, &[]).await
    }

    async fn load_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        Ok(self
            .read_thread(thread_id)
            .await?
            .map(|(_, messages)| messages)
            .unwrap_or_default())
    }

    async fn save_messages(&self, messages: &[ConversationMessage]) -> Result<(), RepositoryError> {
        let _guard = self.write_lock.lock().await;
        for (thread_id, group) in by_thread(messages) {
            let (thread, mut existing) = self
                .read_thread(thread_id)
                .await?
                .ok_or_else(|| RepositoryError::ThreadNotFound(thread_id.to_string()))?;
            upsert(&mut existing, &group);
            self.write_thread(&thread, &existing).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{
        ChatMetadata, MessagePart, ToolCall, ToolChoiceMode, ToolInvocationPart, ToolResultRecord,
    };
    use serde_json::json;

    fn assistant_with_tool(thread_id: &str) -> ConversationMessage {
        let call =
            ToolCall::new("call_1", "create_bar_chart").with_input(json!({"title": "Sales"}));
        let mut part = ToolInvocationPart::from_call(&call);
        part.apply_result(&ToolResultRecord::success(
            "call_1",
            "create_bar_chart",
            json!({"status": "complete", "id": "artifact_call_1", "payload": [1, 2.5]}),
        ));
        ConversationMessage::assistant(thread_id)
            .with_id("m2")
            .with_part(MessagePart::text("Here is the chart."))
            .with_part(MessagePart::ToolCall(part))
    }

    #[tokio::test]
    async fn test_round_trip_preserves_parts() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path().join("threads"));
        repo.create_thread(&Thread::new("thread_1", "alice").with_title("Charts"))
            .await
            .unwrap();

        let mut reply = assistant_with_tool("thread_1");
        reply.metadata = Some(ChatMetadata::new(ToolChoiceMode::Auto, 7).with_model("gpt-4o-mini"));
        let messages = vec![
            ConversationMessage::user("thread_1", "chart please").with_id("m1"),
            reply,
        ];
        repo.save_messages(&messages).await.unwrap();

        // Fresh instance reads from disk
        let reopened = JsonlConversationRepository::new(dir.path().join("threads"));
        assert_eq!(reopened.load_messages("thread_1").await.unwrap(), messages);
        let thread = reopened.get_thread("thread_1").await.unwrap().unwrap();
        assert_eq!(thread.title.as_deref(), Some("Charts"));
    }

    #[tokio::test]
    async fn test_upsert_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path());
        repo.create_thread(&Thread::new("t", "alice")).await.unwrap();

        let user = ConversationMessage::user("t", "hi").with_id("m1");
        repo.save_messages(&[user.clone(), assistant_with_tool("t")])
            .await
            .unwrap();
        let edited = ConversationMessage::user("t", "hello").with_id("m1");
        repo.save_messages(&[edited, ConversationMessage::user("t", "again").with_id("m3")])
            .await
            .unwrap();

        let loaded = repo.load_messages("t").await.unwrap();
        let ids: Vec<_> = loaded.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(loaded[0].text(), "hello");
    }

    #[tokio::test]
    async fn test_missing_thread() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path());

        assert!(repo.get_thread("nope").await.unwrap().is_none());
        assert!(repo.load_messages("nope").await.unwrap().is_empty());
        let err = repo
            .save_messages(&[ConversationMessage::user("nope", "hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_existing_keeps_owner() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path());
        repo.create_thread(&Thread::new("t", "alice")).await.unwrap();
        repo.create_thread(&Thread::new("t", "mallory")).await.unwrap();

        let thread = repo.get_thread("t").await.unwrap().unwrap();
        assert!(thread.is_owned_by("alice"));
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path());
        assert!(matches!(
            repo.get_thread("../etc/passwd").await,
            Err(RepositoryError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_line_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonlConversationRepository::new(dir.path());
        repo.create_thread(&Thread::new("t", "alice")).await.unwrap();
        let path = dir.path().join("t.jsonl");
        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n");
        std::fs::write(&path, content).unwrap();

        assert!(matches!(
            repo.load_messages("t").await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}
