//! Tool domain value objects - immutable result and error types
//!
//! These types form the **output side** of a tool invocation. Every call
//! proposed by the model ends in exactly one [`ToolResultRecord`], whose
//! [`ToolOutcome`] is a success, a structured error, or a synthesized timeout.
//! Timeouts are kept distinct from errors so consumers can tell "failed"
//! apart from "gave up waiting".

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error that occurred during tool execution.
///
/// | Code | Raised when |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Input fails the tool's schema |
/// | `NOT_FOUND` | Unknown tool or resource |
/// | `EXECUTION_FAILED` | The tool's own logic failed |
/// | `PERMISSION_DENIED` | Access denied |
/// | `TIMEOUT` | Operation timed out |
/// | `CANCELLED` | The request was cancelled mid-call |
/// | `REJECTED` | The user declined a manual confirmation |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "PERMISSION_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const EXECUTION_FAILED: &'static str = "EXECUTION_FAILED";
    pub const PERMISSION_DENIED: &'static str = "PERMISSION_DENIED";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const CANCELLED: &'static str = "CANCELLED";
    pub const REJECTED: &'static str = "REJECTED";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Common error constructors
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            Self::NOT_FOUND,
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn unknown_tool(tool_name: impl Into<String>) -> Self {
        Self::new(
            Self::NOT_FOUND,
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Self::new(
            Self::PERMISSION_DENIED,
            format!("Permission denied: {}", resource.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(Self::EXECUTION_FAILED, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            Self::TIMEOUT,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(Self::CANCELLED, "Tool call cancelled")
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(Self::REJECTED, message)
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.code == Self::INVALID_ARGUMENT
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Self::NOT_FOUND
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Terminal outcome of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ToolOutcome {
    /// The tool returned a payload
    Success { output: Value },
    /// The tool (or the pipeline around it) failed
    Error { error: ToolError },
    /// No result arrived within the bound; synthesized by the pipeline
    Timeout { after_ms: u64 },
}

/// Result of a tool call, correlated to its call by `call_id`
/// (the ToolResultRecord).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub call_id: String,
    pub tool_name: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
    /// Wall-clock execution time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResultRecord {
    /// Create a successful result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: Value,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Success { output },
            duration_ms: None,
        }
    }

    /// Create a failed result
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Error { error },
            duration_ms: None,
        }
    }

    /// Create a synthesized timeout result
    pub fn timeout(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        after_ms: u64,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Timeout { after_ms },
            duration_ms: Some(after_ms),
        }
    }

    /// Add duration metadata
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Timeout { .. })
    }

    /// Get the output payload
    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ToolOutcome::Success { output } => Some(output),
            _ => None,
        }
    }

    /// Get the error
    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            ToolOutcome::Error { error } => Some(error),
            _ => None,
        }
    }

    /// Render the outcome as the text a model sees on the next step
    pub fn to_model_content(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { output } => match output {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            ToolOutcome::Error { error } => format!("Error: {}", error),
            ToolOutcome::Timeout { after_ms } => {
                format!("Error: tool did not respond within {} ms", after_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("/path/to/file").with_details("File does not exist");

        assert_eq!(err.code, "NOT_FOUND");
        assert!(err.message.contains("/path/to/file"));
        assert!(err.details.is_some());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_result_success() {
        let result = ToolResultRecord::success("call_1", "clock_now", json!({"now": "x"}))
            .with_duration(12);

        assert!(result.is_success());
        assert_eq!(result.output(), Some(&json!({"now": "x"})));
        assert!(result.error().is_none());
        assert_eq!(result.duration_ms, Some(12));
    }

    #[test]
    fn test_result_failure() {
        let result =
            ToolResultRecord::failure("call_2", "http_fetch", ToolError::permission_denied("url"));

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, "PERMISSION_DENIED");
        assert!(result.to_model_content().starts_with("Error: [PERMISSION_DENIED]"));
    }

    #[test]
    fn test_timeout_is_distinct_from_error() {
        let result = ToolResultRecord::timeout("call_3", "create_bar_chart", 30_000);
        assert!(result.is_timeout());
        assert!(result.error().is_none());
        assert!(!result.is_success());
    }

    #[test]
    fn test_result_serializes_flat_status() {
        let result = ToolResultRecord::success("c", "t", json!("ok"));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["output"], "ok");
        assert_eq!(value["call_id"], "c");
    }
}
