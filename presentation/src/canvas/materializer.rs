//! Artifact materializer.
//!
//! Runs as a background task fed with artifact updates extracted from
//! frames. Per artifact id:
//!
//! ```text
//! unseen ──first update──▶ pending ──▶ (partial)* ──▶ complete | error
//!                             │                          ▲
//!                             ├── soft timeout: warn      │
//!                             └── hard timeout ──▶ timeout┘
//! ```
//!
//! The view is told to show itself as soon as an artifact appears; redraws
//! are coalesced over a short debounce window.

use super::view::CanvasView;
use chatflow_domain::canvas::ApplyOutcome;
use chatflow_domain::{ArtifactRegistry, ArtifactUpdate, CanvasArtifact, StreamFrame};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timer settings for the materializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasTimings {
    /// Past this, a non-terminal artifact is flagged as slow
    pub soft_timeout: Duration,
    /// Past this, a non-terminal artifact is forced to `timeout`
    pub hard_timeout: Duration,
    /// Window over which redraws are coalesced
    pub debounce: Duration,
}

impl Default for CanvasTimings {
    fn default() -> Self {
        Self {
            soft_timeout: Duration::from_secs(15),
            hard_timeout: Duration::from_secs(30),
            debounce: Duration::from_millis(150),
        }
    }
}

/// Handle to the materializer task
pub struct CanvasMaterializer {
    sender: mpsc::UnboundedSender<ArtifactUpdate>,
    registry: Arc<Mutex<ArtifactRegistry>>,
    task: JoinHandle<()>,
}

impl CanvasMaterializer {
    /// Start the materializer task. Must be called inside a Tokio runtime.
    pub fn spawn(view: Arc<dyn CanvasView>, timings: CanvasTimings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
        let state = MaterializerState {
            registry: Arc::clone(&registry),
            view,
            timings,
            timers: HashMap::new(),
            render_at: None,
        };
        let task = tokio::spawn(state.run(receiver));
        Self {
            sender,
            registry,
            task,
        }
    }

    /// Feed a frame. Frames that do not concern an artifact are ignored.
    pub fn observe(&self, frame: &StreamFrame) {
        if let Some(update) = ArtifactUpdate::from_frame(frame)
            && self.sender.send(update).is_err()
        {
            warn!("Canvas materializer stopped; dropping artifact update");
        }
    }

    /// Current artifacts in creation order
    pub fn snapshot(&self) -> Vec<CanvasArtifact> {
        self.registry
            .lock()
            .map(|r| r.artifacts().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<CanvasArtifact> {
        self.registry
            .lock()
            .ok()
            .and_then(|r| r.get(id).cloned())
    }

    /// Stop accepting updates and wait until every artifact has settled.
    ///
    /// Artifacts still in flight resolve through their timers, so this
    /// waits at most the hard timeout.
    pub async fn shutdown(self) -> Vec<CanvasArtifact> {
        drop(self.sender);
        if let Err(e) = self.task.await {
            warn!("Canvas materializer task failed: {}", e);
        }
        self.registry
            .lock()
            .map(|r| r.artifacts().into_iter().cloned().collect())
            .unwrap_or_default()
    }
}

struct Timer {
    soft: Option<Instant>,
    hard: Instant,
}

struct MaterializerState {
    registry: Arc<Mutex<ArtifactRegistry>>,
    view: Arc<dyn CanvasView>,
    timings: CanvasTimings,
    timers: HashMap<String, Timer>,
    render_at: Option<Instant>,
}

impl MaterializerState {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<ArtifactUpdate>) {
        let mut open = true;
        loop {
            if !open && self.is_settled() {
                break;
            }
            // Disabled branches are still constructed, so never unwrap here
            let deadline = self
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
            let has_deadline = self.next_deadline().is_some();

            tokio::select! {
                update = receiver.recv(), if open => match update {
                    Some(update) => self.apply(update, Instant::now()),
                    None => open = false,
                },
                _ = tokio::time::sleep_until(deadline), if has_deadline => {
                    self.fire(Instant::now());
                }
            }
        }
        debug!("Canvas materializer finished");
    }

    fn apply(&mut self, update: ArtifactUpdate, now: Instant) {
        let terminal = update.status.is_terminal();
        let (id, outcome) = match self.registry.lock() {
            Ok(mut registry) => {
                let id = registry.resolve_id(&update);
                (id, registry.apply(update, chrono::Utc::now()))
            }
            Err(_) => return,
        };

        match outcome {
            ApplyOutcome::Ignored => {
                debug!(artifact = %id, "Ignoring update for settled artifact");
                return;
            }
            ApplyOutcome::Created => {
                self.view.show();
                if !terminal {
                    self.timers.insert(
                        id.clone(),
                        Timer {
                            soft: Some(now + self.timings.soft_timeout),
                            hard: now + self.timings.hard_timeout,
                        },
                    );
                }
            }
            ApplyOutcome::Updated => {}
        }

        if terminal {
            self.timers.remove(&id);
        }
        self.schedule_render(now);
    }

    fn fire(&mut self, now: Instant) {
        let mut slow = Vec::new();
        let mut expired = Vec::new();
        for (id, timer) in self.timers.iter_mut() {
            if timer.hard <= now {
                expired.push(id.clone());
            } else if let Some(soft) = timer.soft
                && soft <= now
            {
                timer.soft = None;
                slow.push(id.clone());
            }
        }

        for id in slow {
            let artifact = self.registry.lock().ok().and_then(|mut registry| {
                registry.mark_slow(&id).then(|| registry.get(&id).cloned()).flatten()
            });
            if let Some(artifact) = artifact {
                warn!(artifact = %id, "Canvas artifact is slow");
                self.view.warn_slow(&artifact);
            }
        }

        for id in expired {
            self.timers.remove(&id);
            let changed = self
                .registry
                .lock()
                .map(|mut registry| registry.expire(&id, chrono::Utc::now()))
                .unwrap_or(false);
            if changed {
                warn!(artifact = %id, "Canvas artifact timed out");
                self.schedule_render(now);
            }
        }

        if self.render_at.is_some_and(|at| at <= now) {
            self.render_at = None;
            self.render();
        }
    }

    fn schedule_render(&mut self, now: Instant) {
        if self.render_at.is_none() {
            self.render_at = Some(now + self.timings.debounce);
        }
    }

    fn render(&self) {
        let artifacts: Vec<CanvasArtifact> = match self.registry.lock() {
            Ok(registry) => registry.artifacts().into_iter().cloned().collect(),
            Err(_) => return,
        };
        self.view.render(&artifacts);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .values()
            .map(|t| t.soft.map_or(t.hard, |soft| soft.min(t.hard)))
            .chain(self.render_at)
            .min()
    }

    fn is_settled(&self) -> bool {
        self.timers.is_empty() && self.render_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_domain::{ArtifactStatus, ProducerTracker, ToolError, ToolResultRecord};
    use serde_json::json;

    #[derive(Default)]
    struct RecordingView {
        shows: Mutex<usize>,
        renders: Mutex<Vec<Vec<(String, ArtifactStatus)>>>,
        slow: Mutex<Vec<String>>,
    }

    impl CanvasView for RecordingView {
        fn show(&self) {
            *self.shows.lock().unwrap() += 1;
        }

        fn render(&self, artifacts: &[CanvasArtifact]) {
            self.renders
                .lock()
                .unwrap()
                .push(artifacts.iter().map(|a| (a.id.clone(), a.status)).collect());
        }

        fn warn_slow(&self, artifact: &CanvasArtifact) {
            self.slow.lock().unwrap().push(artifact.id.clone());
        }
    }

    fn progress_frame(tracker: &mut ProducerTracker, partial: bool) -> StreamFrame {
        let data = json!({"id": "X", "title": "Sales"});
        let progress = if partial {
            tracker.partial(data).unwrap()
        } else {
            tracker.pending(data).unwrap()
        };
        StreamFrame::ToolProgress(progress)
    }

    fn result_frame() -> StreamFrame {
        StreamFrame::tool_result(&ToolResultRecord::success(
            "call_1",
            "create_bar_chart",
            json!({"status": "complete", "id": "X", "title": "Sales", "payload": {"series": []}}),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_partials_then_result_settle_complete() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");

        canvas.observe(&progress_frame(&mut tracker, true));
        canvas.observe(&progress_frame(&mut tracker, true));
        canvas.observe(&result_frame());
        let artifacts = canvas.shutdown().await;

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].status, ArtifactStatus::Complete);
        assert_eq!(*view.shows.lock().unwrap(), 1);
        // The burst is coalesced into one redraw
        let renders = view.renders.lock().unwrap();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0], vec![("X".to_string(), ArtifactStatus::Complete)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_terminal_result_is_noop() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());

        canvas.observe(&result_frame());
        tokio::time::sleep(Duration::from_secs(1)).await;
        canvas.observe(&result_frame());
        let artifacts = canvas.shutdown().await;

        assert_eq!(artifacts.len(), 1);
        assert_eq!(view.renders.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_then_hard_timeout() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");

        canvas.observe(&progress_frame(&mut tracker, false));
        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(*view.slow.lock().unwrap(), vec!["X".to_string()]);
        assert_eq!(canvas.get("X").unwrap().status, ArtifactStatus::Pending);
        assert!(canvas.get("X").unwrap().slow);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(canvas.get("X").unwrap().status, ArtifactStatus::Timeout);

        // A late result does not resurrect it
        canvas.observe(&result_frame());
        let artifacts = canvas.shutdown().await;
        assert_eq!(artifacts[0].status, ArtifactStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_settles_its_pending_artifact() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");

        canvas.observe(&progress_frame(&mut tracker, false));
        canvas.observe(&StreamFrame::tool_result(&ToolResultRecord::failure(
            "call_1",
            "create_bar_chart",
            ToolError::execution_failed("no rows"),
        )));

        let started = Instant::now();
        let artifacts = canvas.shutdown().await;

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].id, "X");
        assert_eq!(artifacts[0].status, ArtifactStatus::Error);
        // Settled by the result, not by the hard timer
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_timeout_settles_its_pending_artifact() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");

        canvas.observe(&progress_frame(&mut tracker, false));
        tokio::time::sleep(Duration::from_secs(5)).await;
        canvas.observe(&StreamFrame::tool_result(&ToolResultRecord::timeout(
            "call_1",
            "create_bar_chart",
            5_000,
        )));

        let started = Instant::now();
        let artifacts = canvas.shutdown().await;

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].id, "X");
        assert_eq!(artifacts[0].status, ArtifactStatus::Timeout);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(view.slow.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_pending_artifacts() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());
        let mut tracker = ProducerTracker::new("call_1", "create_bar_chart");
        canvas.observe(&progress_frame(&mut tracker, false));

        let started = Instant::now();
        let artifacts = canvas.shutdown().await;

        assert_eq!(artifacts[0].status, ArtifactStatus::Timeout);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_frames_ignored() {
        let view = Arc::new(RecordingView::default());
        let canvas = CanvasMaterializer::spawn(view.clone(), CanvasTimings::default());

        canvas.observe(&StreamFrame::text_delta("hello"));
        canvas.observe(&StreamFrame::tool_result(&ToolResultRecord::success(
            "c2",
            "current_time",
            json!({"iso": "2024-01-01T00:00:00Z"}),
        )));

        assert!(canvas.shutdown().await.is_empty());
        assert_eq!(*view.shows.lock().unwrap(), 0);
    }
}
