//! Console output for streamed chat frames

use super::FrameRenderer;
use chatflow_domain::core::string::truncate;
use chatflow_domain::{FinishReason, ProgressState, StreamFrame};
use colored::Colorize;
use serde_json::Value;

/// Renders frames as colored text.
///
/// Text deltas are written as they arrive; tool activity is shown on its
/// own dimmed lines, so the renderer tracks whether the cursor is in the
/// middle of a text line.
pub struct ConsoleRenderer {
    mid_line: bool,
    show_progress: bool,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self {
            mid_line: false,
            show_progress: true,
        }
    }

    /// Hide `tool-progress` frames
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Start a fresh line for a status line if text is in flight
    fn status_line(&mut self, line: String) -> String {
        let prefix = if self.mid_line { "\n" } else { "" };
        self.mid_line = false;
        format!("{}{}\n", prefix, line)
    }

    fn preview(value: &Value) -> String {
        let compact = serde_json::to_string(value).unwrap_or_default();
        truncate(&compact, 80)
    }

    fn finish_line(reason: FinishReason, input_tokens: u64, output_tokens: u64) -> String {
        let label = match reason {
            FinishReason::Stop => reason.as_str().green(),
            FinishReason::StepLimit | FinishReason::Length => reason.as_str().yellow(),
            _ => reason.as_str().red(),
        };
        format!(
            "{} {} {}",
            "──".dimmed(),
            label,
            format!("({} in / {} out tokens)", input_tokens, output_tokens).dimmed()
        )
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer for ConsoleRenderer {
    fn render(&mut self, frame: &StreamFrame) -> Option<String> {
        match frame {
            StreamFrame::Start { .. } => None,
            StreamFrame::TextDelta { delta } => {
                if delta.is_empty() {
                    return None;
                }
                self.mid_line = !delta.ends_with('\n');
                Some(delta.clone())
            }
            StreamFrame::ToolCall {
                tool_name, input, ..
            } => Some(self.status_line(format!(
                "  {} {} {}",
                "→".cyan(),
                tool_name.cyan().bold(),
                Self::preview(input).dimmed()
            ))),
            StreamFrame::ToolProgress(progress) => {
                if !self.show_progress {
                    return None;
                }
                let state = match progress.state {
                    ProgressState::Pending => "pending",
                    ProgressState::Partial => "partial",
                };
                Some(self.status_line(format!(
                    "  {} {} {} #{}",
                    "…".dimmed(),
                    progress.tool_name.dimmed(),
                    state.dimmed(),
                    progress.sequence
                )))
            }
            StreamFrame::ToolResult {
                tool_name,
                result,
                is_error,
                ..
            } => {
                let line = if *is_error {
                    let message = result
                        .pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("failed");
                    format!("  {} {} {}", "✗".red(), tool_name.red(), message)
                } else {
                    format!(
                        "  {} {} {}",
                        "✓".green(),
                        tool_name.green(),
                        Self::preview(result).dimmed()
                    )
                };
                Some(self.status_line(line))
            }
            StreamFrame::Finish {
                finish_reason,
                usage,
                ..
            } => Some(self.status_line(Self::finish_line(
                *finish_reason,
                usage.input_tokens,
                usage.output_tokens,
            ))),
            StreamFrame::Error {
                message,
                recoverable,
            } => {
                let hint = if *recoverable {
                    " (you can continue the conversation)"
                } else {
                    ""
                };
                Some(self.status_line(format!(
                    "{} {}{}",
                    "Error:".red().bold(),
                    message,
                    hint.dimmed()
                )))
            }
        }
    }

    fn finish(&mut self) -> Option<String> {
        if self.mid_line {
            self.mid_line = false;
            Some("\n".to_string())
        } else {
            None
        }
    }
}
