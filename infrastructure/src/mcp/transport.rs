//! Stdio transport for tool provider processes.
//!
//! A provider is a child process speaking newline-delimited JSON-RPC on its
//! stdin/stdout. [`StdioTransport`] runs a single background reader task
//! that owns stdout and correlates responses with pending requests through
//! `oneshot` channels. Writes are serialized through a mutex, independent
//! of the reader.

use crate::mcp::error::{McpError, Result};
use crate::mcp::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JsonRpcResponseOut, MessageKind,
    classify_message,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::client::ProviderSpec;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<Mutex<BufWriter<BoxedWriter>>>;
type PendingMap = Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// JSON-RPC connection to one provider process.
pub struct StdioTransport {
    label: String,

    /// Background reader task handle.
    reader_handle: JoinHandle<()>,

    /// Request-response correlation (request_id -> oneshot sender).
    pending_responses: PendingMap,

    /// Writer (serialized writes, independent of reader).
    writer: SharedWriter,

    /// Set once the reader has seen end-of-stream.
    closed: Arc<AtomicBool>,

    /// Set when the provider announces `notifications/tools/list_changed`.
    tools_changed: Arc<AtomicBool>,

    /// Provider child process (killed on Drop to prevent orphans).
    child: Option<Child>,
}

impl StdioTransport {
    /// Spawn the provider process and connect to its stdio.
    pub async fn spawn(spec: &ProviderSpec) -> Result<Self> {
        debug!(provider = %spec.id, command = %spec.command, "Spawning tool provider");

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| {
                McpError::SpawnError(std::io::Error::other("Failed to capture stdout"))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::SpawnError(std::io::Error::other("Failed to capture stdin")))?;

        // Provider diagnostics go to our log, never to the terminal
        if let Some(stderr) = child.stderr.take() {
            let label = spec.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(provider = %label, "stderr: {}", line);
                }
            });
        }

        info!(provider = %spec.id, pid = ?child.id(), "Tool provider started");
        Ok(Self::from_io(spec.id.clone(), stdout, stdin, Some(child)))
    }

    /// Build a transport over arbitrary byte streams.
    pub fn from_io<R, W>(
        label: impl Into<String>,
        reader: R,
        writer: W,
        child: Option<Child>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let label = label.into();
        let pending_responses: PendingMap = Arc::new(RwLock::new(HashMap::new()));
        let writer: SharedWriter = Arc::new(Mutex::new(BufWriter::new(Box::new(writer))));
        let closed = Arc::new(AtomicBool::new(false));
        let tools_changed = Arc::new(AtomicBool::new(false));

        let reader_handle = tokio::spawn(Self::reader_loop(
            label.clone(),
            BufReader::new(reader),
            Arc::clone(&pending_responses),
            Arc::clone(&writer),
            Arc::clone(&closed),
            Arc::clone(&tools_changed),
        ));

        Self {
            label,
            reader_handle,
            pending_responses,
            writer,
            closed,
            tools_changed,
            child,
        }
    }

    /// Background reader loop - single owner of the read side.
    ///
    /// - **Response** → `pending_responses` oneshot (request correlation)
    /// - **IncomingRequest** → answered inline (`ping`, otherwise method-not-found)
    /// - **Notification** → `tools/list_changed` sets a flag, others are ignored
    ///
    /// When the loop exits every pending sender is dropped, so waiting
    /// requests observe [`McpError::TransportClosed`].
    async fn reader_loop<R: AsyncRead + Unpin>(
        label: String,
        mut reader: BufReader<R>,
        pending_responses: PendingMap,
        writer: SharedWriter,
        closed: Arc<AtomicBool>,
        tools_changed: Arc<AtomicBool>,
    ) {
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!(provider = %label, "Reader loop: provider closed stdout");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(provider = %label, "Reader loop: read error: {}", e);
                    break;
                }
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            trace!(provider = %label, "Received: {}", trimmed);

            let json_value: Value = match serde_json::from_str(trimmed) {
                Ok(v) => v,
                Err(e) => {
                    // Some providers print banners on stdout; skip them
                    debug!(provider = %label, "Ignoring non-JSON line: {}", e);
                    continue;
                }
            };

            match classify_message(&json_value) {
                MessageKind::Response { id } => {
                    let response: JsonRpcResponse = match serde_json::from_value(json_value) {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(provider = %label, "Failed to parse response: {}", e);
                            continue;
                        }
                    };
                    let sender = pending_responses.write().await.remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => {
                            debug!(provider = %label, "No pending receiver for response id={}", id)
                        }
                    }
                }
                MessageKind::IncomingRequest { id } => {
                    let method = json_value
                        .get("method")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default();
                    let response = if method == "ping" {
                        JsonRpcResponseOut::result(id, serde_json::json!({}))
                    } else {
                        debug!(provider = %label, method = %method, "Rejecting provider request");
                        JsonRpcResponseOut::method_not_found(id, method)
                    };
                    if let Err(e) = write_message(&writer, &response).await {
                        warn!(provider = %label, "Failed to answer provider request: {}", e);
                    }
                }
                MessageKind::Notification => {
                    let method = json_value.get("method").and_then(|m| m.as_str());
                    if method == Some("notifications/tools/list_changed") {
                        info!(provider = %label, "Provider tool list changed");
                        tools_changed.store(true, Ordering::SeqCst);
                    } else {
                        trace!(provider = %label, "Ignoring notification {:?}", method);
                    }
                }
            }
        }

        // Reader ended - drop all senders so receivers get RecvError
        closed.store(true, Ordering::SeqCst);
        pending_responses.write().await.clear();
    }

    /// Send a request and wait for the correlated response's `result`.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }

        let request = JsonRpcRequest::new(method, params);
        let request_id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending_responses.write().await.insert(request_id, tx);

        if let Err(e) = write_message(&self.writer, &request).await {
            // Clean up the pending entry to prevent leaks
            self.pending_responses.write().await.remove(&request_id);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(McpError::TransportClosed),
            Err(_) => {
                self.pending_responses.write().await.remove(&request_id);
                return Err(McpError::Timeout(format!(
                    "{} after {}ms",
                    method,
                    timeout.as_millis()
                )));
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::RpcError {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Send a notification (fire-and-forget).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        write_message(&self.writer, &JsonRpcNotification::new(method, params)).await
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether the provider announced a tool list change since the last call
    pub fn take_tools_changed(&self) -> bool {
        self.tools_changed.swap(false, Ordering::SeqCst)
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.reader_handle.abort();
        if let Some(child) = self.child.as_mut() {
            debug!(provider = %self.label, "Transport dropping, killing provider process");
            let _ = child.start_kill();
        }
    }
}

/// Write one message as a single line.
async fn write_message<T: Serialize>(writer: &SharedWriter, message: &T) -> Result<()> {
    let mut json = serde_json::to_string(message)?;
    trace!("Sending: {}", json);
    json.push('\n');

    let mut writer = writer.lock().await;
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|_| McpError::TransportClosed)?;
    writer.flush().await.map_err(|_| McpError::TransportClosed)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! An in-process provider answering over a duplex stream.

    use super::*;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    pub type Handler =
        Arc<dyn Fn(&str, &Value) -> std::result::Result<Value, (i64, String)> + Send + Sync>;

    /// Start a fake provider. `handler` maps (method, params) to a result.
    /// Notifications are swallowed.
    pub fn fake_provider<F>(handler: F) -> StdioTransport
    where
        F: Fn(&str, &Value) -> std::result::Result<Value, (i64, String)> + Send + Sync + 'static,
    {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        tokio::spawn(serve(server, Arc::new(handler)));
        StdioTransport::from_io("fake", client_read, client_write, None)
    }

    async fn serve(server: DuplexStream, handler: Handler) {
        let (read, mut write): (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) =
            tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            let Some(id) = message.get("id").cloned() else {
                continue;
            };
            let method = message["method"].as_str().unwrap_or_default();
            let params = message.get("params").cloned().unwrap_or(Value::Null);
            let reply = match handler(method, &params) {
                Ok(result) => serde_json::json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err((code, msg)) => serde_json::json!({
                    "jsonrpc": "2.0", "id": id, "error": {"code": code, "message": msg}
                }),
            };
            let mut out = reply.to_string();
            out.push('\n');
            if write.write_all(out.as_bytes()).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_request_correlates_response() {
        let transport =
            fake_provider(|method, params| Ok(json!({"method": method, "echo": params})));

        let result = transport
            .request("tools/list", Some(json!({"cursor": null})), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(result["method"], "tools/list");
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let transport = Arc::new(fake_provider(|_, params| Ok(params.clone())));

        let calls = (0..5).map(|i| {
            let transport = Arc::clone(&transport);
            async move {
                transport
                    .request("tools/call", Some(json!({"n": i})), TIMEOUT)
                    .await
                    .unwrap()
            }
        });
        let results = futures::future::join_all(calls).await;
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result["n"], i);
        }
    }

    #[tokio::test]
    async fn test_rpc_error_mapped() {
        let transport = fake_provider(|_, _| Err((-32602, "bad params".to_string())));
        let err = transport.request("tools/call", None, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, McpError::RpcError { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_closed_stream_fails_pending_request() {
        let (client, server) = tokio::io::duplex(1024);
        let (read, write) = tokio::io::split(client);
        let transport = StdioTransport::from_io("gone", read, write, None);
        drop(server);

        let err = transport.request("tools/list", None, TIMEOUT).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_provider_times_out() {
        let (client, _server) = tokio::io::duplex(1024);
        let (read, write) = tokio::io::split(client);
        let transport = StdioTransport::from_io("silent", read, write, None);

        let err = transport
            .request("tools/list", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Timeout(_)));
        assert!(transport.pending_responses.read().await.is_empty());
    }
}
