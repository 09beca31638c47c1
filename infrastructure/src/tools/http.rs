//! http toolkit: `fetch_url`

use async_trait::async_trait;
use chatflow_application::{ToolContext, ToolExecutor};
use chatflow_domain::{ToolCall, ToolDefinition, ToolError};
use serde_json::{Value, json};

pub const FETCH_URL: &str = "fetch_url";

/// Maximum response body size (5 MB)
const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Default max output text size (50 KB)
const DEFAULT_MAX_TEXT: usize = 50 * 1024;

pub fn fetch_url_definition() -> ToolDefinition {
    ToolDefinition::new(
        FETCH_URL,
        "Fetch a web page or API endpoint over HTTP(S) and return its readable text.",
    )
    .with_property("url", "string", "The http:// or https:// URL to fetch", true)
    .with_property(
        "max_length",
        "integer",
        "Maximum length of returned text in bytes (default: 51200)",
        false,
    )
}

pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolExecutor for FetchUrlTool {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = call.require_string("url").map_err(ToolError::invalid_argument)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::invalid_argument(format!(
                "Only http and https URLs are supported: {}",
                url
            )));
        }
        let max_length = call
            .get_i64("max_length")
            .filter(|v| *v > 0)
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_TEXT);

        let request = self
            .client
            .get(url)
            .header("User-Agent", concat!("chatflow/", env!("CARGO_PKG_VERSION")))
            .send();

        let response = tokio::select! {
            biased;
            _ = ctx.cancellation.cancelled() => return Err(ToolError::cancelled()),
            response = request => response
                .map_err(|e| ToolError::execution_failed(format!("Failed to fetch URL: {}", e)))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution_failed(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content_length = response.content_length().unwrap_or(0);
        if content_length > MAX_BODY_SIZE as u64 {
            return Err(ToolError::execution_failed(format!(
                "Response too large: {} bytes (max: {} bytes)",
                content_length, MAX_BODY_SIZE
            )));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                ToolError::execution_failed(format!("Failed to read response body: {}", e))
            })?;
        if body.len() > MAX_BODY_SIZE {
            return Err(ToolError::execution_failed(format!(
                "Response too large: {} bytes",
                body.len()
            )));
        }

        let body_str = String::from_utf8_lossy(&body);
        let is_html =
            content_type.contains("text/html") || content_type.contains("application/xhtml");
        let text = if is_html {
            html_to_text(&body_str)
        } else {
            body_str.into_owned()
        };
        let (text, truncated) = truncate(text, max_length);

        Ok(json!({
            "url": url,
            "status": status.as_u16(),
            "content_type": content_type,
            "bytes": body.len(),
            "truncated": truncated,
            "text": text,
        }))
    }
}

fn truncate(text: String, max_length: usize) -> (String, bool) {
    if text.len() <= max_length {
        return (text, false);
    }
    let cut = text.floor_char_boundary(max_length);
    (text[..cut].to_string(), true)
}

/// Extract readable text from HTML, stripping tags, scripts, and styles
pub fn html_to_text(html: &str) -> String {
    use scraper::Html;

    let document = Html::parse_document(html);

    // Tags whose entire subtree should be ignored
    let skip_tags = ["script", "style", "noscript", "svg", "head"];

    let parts = collect_element_text(document.root_element(), &skip_tags);
    clean_whitespace(&parts.join(" "))
}

fn collect_element_text(element: scraper::ElementRef, skip_tags: &[&str]) -> Vec<String> {
    if skip_tags.contains(&element.value().name()) {
        return Vec::new();
    }

    let mut parts = Vec::new();
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t.to_string());
                }
            }
            scraper::Node::Element(_) => {
                if let Some(child_el) = scraper::ElementRef::wrap(child) {
                    parts.extend(collect_element_text(child_el, skip_tags));
                }
            }
            _ => {}
        }
    }
    parts
}

/// Collapse runs of whitespace, keeping at most one blank line
fn clean_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_whitespace = false;
    let mut newline_count = 0;

    for ch in text.chars() {
        if ch == '\n' {
            newline_count += 1;
            if newline_count <= 2 {
                result.push('\n');
            }
            prev_was_whitespace = true;
        } else if ch.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
            }
            prev_was_whitespace = true;
            newline_count = 0;
        } else {
            result.push(ch);
            prev_was_whitespace = false;
            newline_count = 0;
        }
    }

    result.trim().to_string()
}
