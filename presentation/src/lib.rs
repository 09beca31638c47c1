//! Presentation layer for chatflow
//!
//! This crate contains CLI definitions, frame renderers, the canvas
//! materializer, progress reporters, and the interactive chat interface.

pub mod canvas;
pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use canvas::{CanvasMaterializer, CanvasTimings, CanvasView, ConsoleCanvasView};
pub use chat::{ChatDriver, ChatRepl, ChatSession, InteractiveConfirmation, RefreshHook};
pub use cli::{Cli, OutputFormat, ProviderGrant};
pub use output::{ConsoleRenderer, FrameRenderer, NdjsonRenderer, format_tool_list, renderer_for};
pub use progress::{ProgressReporter, SimpleProgress};
