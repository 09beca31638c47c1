//! Shared utilities for use cases.
//!
//! Cancellation checking and frame sending helpers used by the chat turn
//! and its sub-components.

use chatflow_domain::StreamFrame;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ports::frame_writer::FrameWriter;
use crate::use_cases::run_chat::ChatError;

/// Check if cancellation has been requested.
///
/// Returns `Err(ChatError::Cancelled)` if the token is cancelled.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), ChatError> {
    if token.is_cancelled() {
        return Err(ChatError::Cancelled);
    }
    Ok(())
}

/// Send a frame, waiting for buffer space unless the turn is cancelled.
///
/// A closed channel means the client went away, which cancels the rest of
/// the turn.
pub(crate) async fn send_frame(
    writer: &FrameWriter,
    cancel: &CancellationToken,
    frame: StreamFrame,
) {
    let frame_type = frame.type_name();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(frame = frame_type, "Turn cancelled; frame not sent");
        }
        sent = writer.send(frame) => {
            if sent.is_err() {
                debug!(frame = frame_type, "Frame consumer disconnected; cancelling turn");
                cancel.cancel();
            }
        }
    }
}
