//! Recognizing artifact updates in stream frames.

use serde_json::Value;

use super::artifact::ArtifactStatus;
use crate::stream::frame::StreamFrame;

/// Tools whose results are materialized as canvas artifacts
pub const VISUAL_ARTIFACT_TOOLS: &[&str] = &[
    "create_bar_chart",
    "create_line_chart",
    "create_pie_chart",
    "create_table",
];

pub fn is_visual_artifact_tool(tool_name: &str) -> bool {
    VISUAL_ARTIFACT_TOOLS.contains(&tool_name)
}

/// A normalized update for one artifact, extracted from a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactUpdate {
    /// Id declared by the payload. Error and timeout results carry none and
    /// are matched to their artifact through `tool_call_id`.
    pub id: Option<String>,
    pub kind: String,
    pub tool_call_id: String,
    pub status: ArtifactStatus,
    pub title: Option<String>,
    pub payload: Option<Value>,
}

impl ArtifactUpdate {
    /// Extract an artifact update from a frame, if the frame concerns one.
    ///
    /// Recognized frames are `tool-progress` and `tool-result` frames of an
    /// allow-listed tool. A result from any other tool is still recognized
    /// when its payload carries `"canvas": true` (legacy producers).
    pub fn from_frame(frame: &StreamFrame) -> Option<Self> {
        match frame {
            StreamFrame::ToolProgress(progress) => {
                if !is_visual_artifact_tool(&progress.tool_name)
                    && !has_legacy_flag(&progress.data)
                {
                    return None;
                }
                let status = match progress.state {
                    crate::tool::progress::ProgressState::Pending => ArtifactStatus::Pending,
                    crate::tool::progress::ProgressState::Partial => ArtifactStatus::Partial,
                };
                Some(Self::from_payload(
                    &progress.tool_call_id,
                    &progress.tool_name,
                    &progress.data,
                    status,
                ))
            }
            StreamFrame::ToolResult {
                tool_call_id,
                tool_name,
                result,
                is_error,
                ..
            } => {
                if !is_visual_artifact_tool(tool_name) && !has_legacy_flag(result) {
                    return None;
                }
                let declared = result
                    .get("status")
                    .and_then(|s| s.as_str())
                    .and_then(ArtifactStatus::parse);
                let status = match (declared, *is_error) {
                    (Some(ArtifactStatus::Timeout), _) => ArtifactStatus::Timeout,
                    (_, true) => ArtifactStatus::Error,
                    // A final result is terminal even if it only says "partial"
                    (Some(s), false) if s.is_terminal() => s,
                    (_, false) => ArtifactStatus::Complete,
                };
                Some(Self::from_payload(tool_call_id, tool_name, result, status))
            }
            _ => None,
        }
    }

    fn from_payload(
        tool_call_id: &str,
        tool_name: &str,
        data: &Value,
        status: ArtifactStatus,
    ) -> Self {
        let id = data.get("id").and_then(|v| v.as_str()).map(String::from);
        let title = data.get("title").and_then(|v| v.as_str()).map(String::from);
        let payload = data.get("payload").cloned().or_else(|| match status {
            ArtifactStatus::Error | ArtifactStatus::Timeout => data.get("error").cloned(),
            _ => None,
        });

        Self {
            id,
            kind: tool_name.to_string(),
            tool_call_id: tool_call_id.to_string(),
            status,
            title,
            payload,
        }
    }
}

fn has_legacy_flag(payload: &Value) -> bool {
    payload.get("canvas").and_then(|v| v.as_bool()) == Some(true)
}
