//! Newline-delimited JSON output

use super::FrameRenderer;
use chatflow_domain::StreamFrame;

/// Writes every frame as one JSON object per line
pub struct NdjsonRenderer;

impl FrameRenderer for NdjsonRenderer {
    fn render(&mut self, frame: &StreamFrame) -> Option<String> {
        match serde_json::to_string(frame) {
            Ok(line) => Some(format!("{}\n", line)),
            Err(e) => {
                tracing::warn!("Could not serialize {} frame: {}", frame.type_name(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_line_per_frame() {
        let mut renderer = NdjsonRenderer;
        let line = renderer.render(&StreamFrame::text_delta("hi\nthere")).unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "text-delta");
        assert_eq!(value["delta"], "hi\nthere");
    }
}
