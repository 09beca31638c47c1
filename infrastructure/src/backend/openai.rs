//! OpenAI-compatible chat completions backend (streaming).
//!
//! Speaks `POST {base_url}/chat/completions` with `stream: true` and decodes
//! the server-sent events. Text deltas are forwarded as they arrive; tool
//! call fragments are accumulated per `index` and emitted whole once the
//! stream ends, followed by the finish event.

use async_trait::async_trait;
use chatflow_application::{
    BackendError, BackendEvent, ModelBackend, ModelMessage, StepRequest, StepStream,
};
use chatflow_domain::{FinishReason, ToolCall, ToolDefinition, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FileBackendConfig;

/// Events buffered between the SSE reader task and the turn loop
const EVENT_BUFFER: usize = 64;

pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    pub fn from_config(config: &FileBackendConfig) -> Self {
        let backend = Self::new(&config.base_url, &config.model)
            .with_request_timeout(config.request_timeout());
        match config.api_key() {
            Some(key) => backend.with_api_key(key),
            None => {
                debug!(
                    env = %config.api_key_env,
                    "No API key in environment, sending unauthenticated requests"
                );
                backend
            }
        }
    }

    fn build_body(&self, request: &StepRequest) -> ChatCompletionRequest {
        let tools: Vec<WireTool> = request.tools.iter().map(WireTool::from).collect();
        ChatCompletionRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            stream: true,
            stream_options: StreamOptions { include_usage: true },
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn stream_step(
        &self,
        request: StepRequest,
        cancellation: CancellationToken,
    ) -> Result<StepStream, BackendError> {
        let body = self.build_body(&request);
        debug!(
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Starting completion stream"
        );

        let mut http = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(BackendError::StreamClosed),
            response = http.send() => response.map_err(map_transport_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            return Err(match status.as_u16() {
                401 | 403 => BackendError::Authentication(format!("{}: {}", status, snippet)),
                _ => BackendError::RequestFailed(format!("{}: {}", status, snippet)),
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(response, tx, cancellation));
        Ok(StepStream::new(rx))
    }
}

fn map_transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Connection(e.to_string())
    } else {
        BackendError::RequestFailed(e.to_string())
    }
}

/// Reads the SSE body and forwards decoded events until `[DONE]`, the end
/// of the body, cancellation, or a dropped receiver.
async fn pump_events(
    response: reqwest::Response,
    tx: mpsc::Sender<BackendEvent>,
    cancellation: CancellationToken,
) {
    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::default();
    let mut assembler = StepAssembler::default();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("Completion stream cancelled");
                return;
            }
            chunk = bytes.next() => chunk,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                let _ = tx.send(BackendEvent::Error(format!("Stream error: {}", e))).await;
                return;
            }
            None => break,
        };

        for data in decoder.push(&chunk) {
            if data.trim() == "[DONE]" {
                for event in assembler.finish() {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                return;
            }
            for event in assembler.accept(&data) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    }

    // Body ended without [DONE]
    for data in decoder.flush() {
        if data.trim() != "[DONE]" {
            for event in assembler.accept(&data) {
                let _ = tx.send(event).await;
            }
        }
    }
    if assembler.saw_finish_reason() {
        for event in assembler.finish() {
            let _ = tx.send(event).await;
        }
    } else {
        warn!("Completion stream ended before a finish reason");
        let _ = tx.send(BackendEvent::Error("Stream closed before completion".to_string())).await;
    }
}

/// Splits a byte stream into SSE `data` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed bytes; returns the data of every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // `event:`, `id:`, `retry:` and comments are not used by this API
        }
        events
    }

    /// Data of a trailing event that lacked its blank line
    pub fn flush(&mut self) -> Vec<String> {
        let mut events = self.push(b"\n");
        if !self.data.is_empty() {
            events.push(self.data.join("\n"));
            self.data.clear();
        }
        events
    }
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Turns decoded chunks into [`BackendEvent`]s
#[derive(Debug, Default)]
pub struct StepAssembler {
    calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<String>,
    usage: Usage,
}

impl StepAssembler {
    /// Apply one `data` payload. Unparseable payloads are skipped.
    pub fn accept(&mut self, data: &str) -> Vec<BackendEvent> {
        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!("Skipping unparseable stream chunk: {}", e);
                return Vec::new();
            }
        };

        if let Some(usage) = chunk.usage {
            self.usage = Usage::new(usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(error) = chunk.error {
            return vec![BackendEvent::Error(error.message)];
        }

        let mut events = Vec::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content
                && !content.is_empty()
            {
                events.push(BackendEvent::TextDelta(content));
            }
            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                let call = self.calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    call.id = Some(id);
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        call.arguments.push_str(&arguments);
                    }
                }
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }
        events
    }

    pub fn saw_finish_reason(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Assembled tool calls in index order, then the finish event
    pub fn finish(&mut self) -> Vec<BackendEvent> {
        let calls = std::mem::take(&mut self.calls);
        let had_calls = !calls.is_empty();
        let mut events: Vec<BackendEvent> = calls
            .into_iter()
            .map(|(index, partial)| {
                let input = if partial.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    // Malformed JSON is passed through as a string so input
                    // validation reports it against the tool's schema
                    serde_json::from_str(&partial.arguments)
                        .unwrap_or(Value::String(partial.arguments))
                };
                let call_id = partial.id.unwrap_or_else(|| format!("call_{}", index));
                BackendEvent::ToolCall {
                    call: ToolCall::new(call_id, partial.name).with_input(input),
                    provider_metadata: Some(serde_json::json!({ "index": index })),
                }
            })
            .collect();

        let finish_reason = match self.finish_reason.take() {
            Some(reason) => FinishReason::from_backend(&reason),
            None if had_calls => FinishReason::ToolCalls,
            None => FinishReason::Stop,
        };
        events.push(BackendEvent::Finish {
            finish_reason,
            usage: self.usage,
        });
        events
    }
}

// Wire types (request)

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

impl From<&ModelMessage> for WireMessage {
    fn from(message: &ModelMessage) -> Self {
        let plain = |role, content: &String| WireMessage {
            role,
            content: Some(content.clone()),
            tool_call_id: None,
            tool_calls: Vec::new(),
        };
        match message {
            ModelMessage::System(text) => plain("system", text),
            ModelMessage::User(text) => plain("user", text),
            ModelMessage::Assistant { text, tool_calls } => WireMessage {
                role: "assistant",
                // Assistant messages carrying tool calls may have null content
                content: (!text.is_empty() || tool_calls.is_empty()).then(|| text.clone()),
                tool_call_id: None,
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.call_id.clone(),
                        kind: "function",
                        function: WireFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: call.input.to_string(),
                        },
                    })
                    .collect(),
            },
            ModelMessage::ToolResult { call_id, content, .. } => WireMessage {
                role: "tool",
                content: Some(content.clone()),
                tool_call_id: Some(call_id.clone()),
                tool_calls: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for WireTool {
    fn from(definition: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: definition.name.clone(),
                description: definition.description.clone(),
                parameters: definition.input_schema.clone(),
            },
        }
    }
}

// Wire types (streaming response)

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunction>,
}

#[derive(Debug, Deserialize)]
struct StreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}
