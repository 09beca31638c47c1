//! Host view for canvas artifacts

use chatflow_domain::{ArtifactStatus, CanvasArtifact};
use colored::Colorize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The surface artifacts are shown on.
///
/// Called from the materializer task; implementations must not block.
pub trait CanvasView: Send + Sync {
    /// The first artifact of a burst appeared: make the canvas visible
    fn show(&self);

    /// Redraw with the current artifacts (debounced)
    fn render(&self, artifacts: &[CanvasArtifact]);

    /// An artifact is taking longer than expected
    fn warn_slow(&self, _artifact: &CanvasArtifact) {}
}

/// Prints artifact status changes to stderr
pub struct ConsoleCanvasView {
    visible: AtomicBool,
    // Last printed status per artifact id
    printed: Mutex<HashMap<String, ArtifactStatus>>,
}

impl ConsoleCanvasView {
    pub fn new() -> Self {
        Self {
            visible: AtomicBool::new(false),
            printed: Mutex::new(HashMap::new()),
        }
    }

    fn status_label(status: ArtifactStatus) -> colored::ColoredString {
        match status {
            ArtifactStatus::Pending | ArtifactStatus::Partial => status.as_str().yellow(),
            ArtifactStatus::Complete => status.as_str().green(),
            ArtifactStatus::Error | ArtifactStatus::Timeout => status.as_str().red(),
        }
    }
}

impl Default for ConsoleCanvasView {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasView for ConsoleCanvasView {
    fn show(&self) {
        if !self.visible.swap(true, Ordering::Relaxed) {
            eprintln!("{}", "── canvas ──".cyan().bold());
        }
    }

    fn render(&self, artifacts: &[CanvasArtifact]) {
        let Ok(mut printed) = self.printed.lock() else {
            return;
        };
        for artifact in artifacts {
            if printed.insert(artifact.id.clone(), artifact.status) == Some(artifact.status) {
                continue;
            }
            eprintln!(
                "  {} {} {}",
                Self::status_label(artifact.status),
                artifact.title.as_deref().unwrap_or(&artifact.id).bold(),
                format!("[{}]", artifact.kind).dimmed()
            );
        }
    }

    fn warn_slow(&self, artifact: &CanvasArtifact) {
        eprintln!(
            "  {} {} is taking longer than usual",
            "⚠".yellow(),
            artifact.title.as_deref().unwrap_or(&artifact.id)
        );
    }
}
