//! Response frame channel
//!
//! One ordered writer per request over a bounded channel: a slow consumer
//! suspends the turn instead of growing an unbounded buffer.

use chatflow_domain::StreamFrame;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default number of frames buffered between producer and consumer
pub const DEFAULT_FRAME_BUFFER: usize = 64;

/// The consumer dropped the receiving side.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Frame channel closed")]
pub struct FrameChannelClosed;

/// Writing side of a turn's frame channel
#[derive(Clone)]
pub struct FrameWriter {
    sender: mpsc::Sender<StreamFrame>,
}

impl FrameWriter {
    /// Send a frame, waiting for buffer space
    pub async fn send(&self, frame: StreamFrame) -> Result<(), FrameChannelClosed> {
        self.sender.send(frame).await.map_err(|_| FrameChannelClosed)
    }

    /// Send without waiting; returns false when the frame was dropped
    pub fn try_send(&self, frame: StreamFrame) -> bool {
        self.sender.try_send(frame).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Reading side of a turn's frame channel
pub struct FrameStream {
    pub receiver: mpsc::Receiver<StreamFrame>,
}

impl FrameStream {
    pub async fn next(&mut self) -> Option<StreamFrame> {
        self.receiver.recv().await
    }

    /// Drain every remaining frame (used by tests and non-streaming callers)
    pub async fn collect(mut self) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        while let Some(frame) = self.receiver.recv().await {
            frames.push(frame);
        }
        frames
    }
}

/// Create a bounded frame channel
pub fn frame_channel(capacity: usize) -> (FrameWriter, FrameStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (FrameWriter { sender }, FrameStream { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (writer, stream) = frame_channel(4);
        writer.send(StreamFrame::text_delta("a")).await.unwrap();
        writer.send(StreamFrame::text_delta("b")).await.unwrap();
        drop(writer);

        let frames = stream.collect().await;
        assert_eq!(
            frames,
            vec![StreamFrame::text_delta("a"), StreamFrame::text_delta("b")]
        );
    }

    #[tokio::test]
    async fn test_send_after_consumer_dropped() {
        let (writer, stream) = frame_channel(1);
        drop(stream);
        assert_eq!(
            writer.send(StreamFrame::text_delta("x")).await,
            Err(FrameChannelClosed)
        );
        assert!(writer.is_closed());
    }

    #[tokio::test]
    async fn test_try_send_drops_when_full() {
        let (writer, _stream) = frame_channel(1);
        assert!(writer.try_send(StreamFrame::text_delta("1")));
        assert!(!writer.try_send(StreamFrame::text_delta("2")));
    }
}
