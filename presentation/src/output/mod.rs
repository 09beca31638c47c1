//! Frame rendering
//!
//! A [`FrameRenderer`] turns streamed frames into text for the terminal:
//! [`ConsoleRenderer`] for people, [`NdjsonRenderer`] for pipes.

pub mod console;
pub mod ndjson;
pub mod tools;

use chatflow_domain::StreamFrame;

pub use console::ConsoleRenderer;
pub use ndjson::NdjsonRenderer;
pub use tools::format_tool_list;

/// Converts frames to output text, one frame at a time.
pub trait FrameRenderer: Send {
    /// Text to write for `frame`, if any
    fn render(&mut self, frame: &StreamFrame) -> Option<String>;

    /// Text to write once the stream has ended
    fn finish(&mut self) -> Option<String> {
        None
    }
}

/// Build the renderer for an output format
pub fn renderer_for(format: chatflow_domain::OutputFormat) -> Box<dyn FrameRenderer> {
    match format {
        chatflow_domain::OutputFormat::Console => Box::new(ConsoleRenderer::new()),
        chatflow_domain::OutputFormat::Json => Box::new(NdjsonRenderer),
    }
}
