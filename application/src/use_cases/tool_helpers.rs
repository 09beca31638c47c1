//! Shared helpers for tool use cases.

use chatflow_domain::ToolCall;

/// Extract a short preview string from tool call input.
///
/// Looks for well-known keys (`url`, `title`, `query`, `path`, `workflow`)
/// first, then falls back to the first string value found.
pub(crate) fn tool_args_preview(call: &ToolCall) -> String {
    let Some(args) = call.input.as_object() else {
        return String::new();
    };
    let keys = ["url", "title", "query", "path", "workflow"];
    for key in &keys {
        if let Some(serde_json::Value::String(s)) = args.get(*key) {
            return truncate_preview(s, 50);
        }
    }
    // Fallback: first string value
    for value in args.values() {
        if let Some(s) = value.as_str() {
            return truncate_preview(s, 50);
        }
    }
    String::new()
}

fn truncate_preview(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_call(input: serde_json::Value) -> ToolCall {
        ToolCall::new("call_1", "test_tool").with_input(input)
    }

    #[test]
    fn test_url_key_preferred() {
        let call = make_call(json!({"other": "ignored", "url": "https://example.com"}));
        assert_eq!(tool_args_preview(&call), "https://example.com");
    }

    #[test]
    fn test_title_key() {
        let call = make_call(json!({"title": "Quarterly sales"}));
        assert_eq!(tool_args_preview(&call), "Quarterly sales");
    }

    #[test]
    fn test_fallback_to_first_string() {
        let call = make_call(json!({"foo": "bar"}));
        assert_eq!(tool_args_preview(&call), "bar");
    }

    #[test]
    fn test_empty_and_non_object_input() {
        assert_eq!(tool_args_preview(&make_call(json!({}))), "");
        assert_eq!(tool_args_preview(&make_call(json!([1, 2]))), "");
        assert_eq!(tool_args_preview(&make_call(json!({"count": 42}))), "");
    }

    #[test]
    fn test_truncation() {
        let call = make_call(json!({"path": "a".repeat(100)}));
        let result = tool_args_preview(&call);
        assert!(result.chars().count() <= 50);
        assert!(result.ends_with('…'));
    }
}
