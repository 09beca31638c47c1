//! Canvas: live visual artifacts built from tool frames
//!
//! The [`CanvasMaterializer`] watches the same frames the renderer prints,
//! keeps an [`ArtifactRegistry`](chatflow_domain::ArtifactRegistry) up to
//! date and drives a [`CanvasView`].

mod materializer;
mod view;

pub use materializer::{CanvasMaterializer, CanvasTimings};
pub use view::{CanvasView, ConsoleCanvasView};
