//! Artifact registry with idempotent upsert by id.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::artifact::{ArtifactStatus, CanvasArtifact};
use super::event::ArtifactUpdate;

/// What applying an update did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First event for this id: a pending entry was created
    Created,
    Updated,
    /// Update arrived after a terminal state and was ignored
    Ignored,
}

/// In-memory map of artifacts keyed by id, preserving creation order.
///
/// Each artifact also remembers the tool call that produced it, so a result
/// frame without an `id` lands on the artifact its progress frames created.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    artifacts: HashMap<String, CanvasArtifact>,
    order: Vec<String>,
    by_call: HashMap<String, String>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifact id an update applies to: the declared id, else the artifact
    /// already opened by the same tool call, else the call id itself.
    pub fn resolve_id(&self, update: &ArtifactUpdate) -> String {
        update
            .id
            .clone()
            .or_else(|| self.by_call.get(&update.tool_call_id).cloned())
            .unwrap_or_else(|| update.tool_call_id.clone())
    }

    /// Apply one update.
    ///
    /// Terminal artifacts never change again, so replaying a terminal event
    /// is a no-op.
    pub fn apply(&mut self, update: ArtifactUpdate, now: DateTime<Utc>) -> ApplyOutcome {
        let id = self.resolve_id(&update);
        if let Some(existing) = self.artifacts.get_mut(&id) {
            if existing.status.is_terminal() {
                return ApplyOutcome::Ignored;
            }
            existing.status = update.status;
            if update.title.is_some() {
                existing.title = update.title;
            }
            if let Some(payload) = update.payload {
                existing.payload = payload;
            }
            existing.last_updated = now;
            return ApplyOutcome::Updated;
        }

        self.by_call
            .entry(update.tool_call_id.clone())
            .or_insert_with(|| id.clone());
        let artifact = CanvasArtifact {
            id: id.clone(),
            kind: update.kind,
            title: update.title,
            status: update.status,
            payload: update.payload.unwrap_or(serde_json::Value::Null),
            tool_call_id: update.tool_call_id,
            created_at: now,
            last_updated: now,
            slow: false,
        };
        self.order.push(id.clone());
        self.artifacts.insert(id, artifact);
        ApplyOutcome::Created
    }

    /// Flag a non-terminal artifact as slow. Returns true when newly flagged.
    pub fn mark_slow(&mut self, id: &str) -> bool {
        match self.artifacts.get_mut(id) {
            Some(a) if !a.status.is_terminal() && !a.slow => {
                a.slow = true;
                true
            }
            _ => false,
        }
    }

    /// Force a non-terminal artifact into `timeout`. Returns true on change.
    pub fn expire(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.artifacts.get_mut(id) {
            Some(a) if !a.status.is_terminal() => {
                a.status = ArtifactStatus::Timeout;
                a.last_updated = now;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&CanvasArtifact> {
        self.artifacts.get(id)
    }

    /// Artifacts in creation order
    pub fn artifacts(&self) -> Vec<&CanvasArtifact> {
        self.order
            .iter()
            .filter_map(|id| self.artifacts.get(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.artifacts
                    .get(*id)
                    .is_some_and(|a| !a.status.is_terminal())
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frame::StreamFrame;
    use crate::tool::progress::ProducerTracker;
    use crate::tool::value_objects::{ToolError, ToolResultRecord};
    use serde_json::json;

    fn update(
        id: &str,
        status: ArtifactStatus,
        payload: Option<serde_json::Value>,
    ) -> ArtifactUpdate {
        ArtifactUpdate {
            id: Some(id.to_string()),
            kind: "create_bar_chart".to_string(),
            tool_call_id: "call_1".to_string(),
            status,
            title: None,
            payload,
        }
    }

    #[test]
    fn test_partial_partial_complete_yields_one_complete_artifact() {
        let mut registry = ArtifactRegistry::new();
        let now = Utc::now();

        assert_eq!(
            registry.apply(update("X", ArtifactStatus::Partial, Some(json!(1))), now),
            ApplyOutcome::Created
        );
        assert_eq!(
            registry.apply(update("X", ArtifactStatus::Partial, Some(json!(2))), now),
            ApplyOutcome::Updated
        );
        registry.apply(update("X", ArtifactStatus::Complete, Some(json!(3))), now);

        assert_eq!(registry.len(), 1);
        let artifact = registry.get("X").unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Complete);
        assert_eq!(artifact.payload, json!(3));
    }

    #[test]
    fn test_repeated_terminal_event_is_noop() {
        let mut registry = ArtifactRegistry::new();
        let now = Utc::now();
        registry.apply(update("X", ArtifactStatus::Complete, Some(json!("a"))), now);

        let outcome = registry.apply(update("X", ArtifactStatus::Complete, Some(json!("a"))), now);

        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_expire_only_non_terminal() {
        let mut registry = ArtifactRegistry::new();
        let now = Utc::now();
        registry.apply(update("A", ArtifactStatus::Pending, None), now);
        registry.apply(update("B", ArtifactStatus::Complete, None), now);

        assert_eq!(registry.pending_ids(), vec!["A".to_string()]);
        assert!(registry.mark_slow("A"));
        assert!(!registry.mark_slow("A"));
        assert!(registry.expire("A", now));
        assert!(!registry.expire("B", now));
        assert_eq!(registry.get("A").unwrap().status, ArtifactStatus::Timeout);

        // Late success after timeout does not resurrect the artifact
        assert_eq!(
            registry.apply(update("A", ArtifactStatus::Complete, None), now),
            ApplyOutcome::Ignored
        );
    }

    #[test]
    fn test_creation_order_preserved() {
        let mut registry = ArtifactRegistry::new();
        let now = Utc::now();
        registry.apply(update("b", ArtifactStatus::Pending, None), now);
        registry.apply(update("a", ArtifactStatus::Pending, None), now);

        let ids: Vec<_> = registry.artifacts().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_failed_result_settles_artifact_opened_by_progress() {
        let mut registry = ArtifactRegistry::new();
        let now = Utc::now();
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");
        let pending = tracker.pending(json!({"id": "artifact_call_1"})).unwrap();
        registry.apply(
            ArtifactUpdate::from_frame(&StreamFrame::ToolProgress(pending)).unwrap(),
            now,
        );

        let failed = ToolResultRecord::failure(
            "call_1",
            "create_bar_chart",
            ToolError::execution_failed("no data"),
        );
        let outcome = registry.apply(
            ArtifactUpdate::from_frame(&StreamFrame::tool_result(&failed)).unwrap(),
            now,
        );
        assert_eq!(outcome, ApplyOutcome::Updated);

        // A later timeout for the same call is ignored, not a second artifact
        let timed_out = ToolResultRecord::timeout("call_1", "create_bar_chart", 60_000);
        let outcome = registry.apply(
            ArtifactUpdate::from_frame(&StreamFrame::tool_result(&timed_out)).unwrap(),
            now,
        );
        assert_eq!(outcome, ApplyOutcome::Ignored);

        assert_eq!(registry.len(), 1);
        let artifact = registry.get("artifact_call_1").unwrap();
        assert_eq!(artifact.status, ArtifactStatus::Error);
        assert_eq!(artifact.payload["code"], ToolError::EXECUTION_FAILED);
    }

    #[test]
    fn test_result_without_progress_keys_by_call_id() {
        let mut registry = ArtifactRegistry::new();
        let timed_out = ToolResultRecord::timeout("call_7", "create_table", 1_000);
        registry.apply(
            ArtifactUpdate::from_frame(&StreamFrame::tool_result(&timed_out)).unwrap(),
            Utc::now(),
        );
        assert_eq!(registry.get("call_7").unwrap().status, ArtifactStatus::Timeout);
    }
}
