//! Canvas domain module
//!
//! Visual artifacts materialized from tool results. Each artifact is tracked
//! by id through `unseen → pending → (partial)* → {complete | error | timeout}`.
//! The pure state machine lives here; timers and debouncing live in the
//! presentation layer's materializer.

pub mod artifact;
pub mod event;
pub mod registry;

pub use artifact::{ArtifactStatus, CanvasArtifact};
pub use event::{ArtifactUpdate, VISUAL_ARTIFACT_TOOLS, is_visual_artifact_tool};
pub use registry::{ApplyOutcome, ArtifactRegistry};
