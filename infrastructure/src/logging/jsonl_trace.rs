//! JSONL file writer for turn trace events.
//!
//! Each [`TraceEvent`] is serialized as a single JSON line with a `type`
//! field and `timestamp`, appended to the file via a buffered writer.

use chatflow_application::{TraceError, TraceEvent, TraceSink};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Trace sink that appends one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record
/// and on `Drop`.
pub struct JsonlTraceSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTraceSink {
    /// Open (or create) the trace file in append mode.
    ///
    /// Creates parent directories if they don't exist. Returns `None` if the
    /// file cannot be opened; tracing is then simply disabled.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create trace directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open trace file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonlTraceSink {
    fn record(&self, event: TraceEvent) -> Result<(), TraceError> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // Merge payload with type + timestamp
        let record = if let serde_json::Value::Object(mut map) = event.payload {
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.event_type.to_string()),
            );
            map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
            serde_json::Value::Object(map)
        } else {
            serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": event.payload,
            })
        };

        let line = serde_json::to_string(&record).map_err(|e| TraceError(e.to_string()))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| TraceError("trace writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", line).map_err(|e| TraceError(e.to_string()))?;
        // JSONL is append-only; flush so a crash loses at most one line
        writer.flush().map_err(|e| TraceError(e.to_string()))
    }
}

impl Drop for JsonlTraceSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let sink = JsonlTraceSink::new(&path).unwrap();

        sink.record(TraceEvent::new(
            "registry_assembled",
            serde_json::json!({"tools": 7, "failed_sources": ["external_provider"]}),
        ))
        .unwrap();
        sink.record(TraceEvent::new("turn_finished", serde_json::json!({"finishReason": "stop"})))
            .unwrap();
        drop(sink);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.get("timestamp").is_some()));
        assert_eq!(lines[0]["type"], "registry_assembled");
        assert_eq!(lines[0]["tools"], 7);
        assert_eq!(lines[1]["finishReason"], "stop");
    }

    #[test]
    fn test_non_object_payload_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        let sink = JsonlTraceSink::new(&path).unwrap();

        sink.record(TraceEvent::new("note", serde_json::json!("just a string")))
            .unwrap();
        drop(sink);

        let lines = read_lines(&path);
        assert_eq!(lines[0]["type"], "note");
        assert_eq!(lines[0]["data"], "just a string");
    }

    #[test]
    fn test_appends_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/trace.jsonl");

        for n in 0..2 {
            let sink = JsonlTraceSink::new(&path).unwrap();
            sink.record(TraceEvent::new("turn_started", serde_json::json!({"n": n})))
                .unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["n"], 1);
    }
}
