//! Running one turn against the terminal.
//!
//! The use case writes frames into a bounded channel; this side drains it
//! concurrently, printing each frame and feeding the canvas. Ctrl+C
//! cancels the turn instead of killing the process.

use crate::canvas::CanvasMaterializer;
use crate::output::FrameRenderer;
use chatflow_application::{
    ChatError, ChatProgressNotifier, ModelBackend, RunChatInput, RunChatOutput, RunChatUseCase,
    frame_channel,
};
use chatflow_domain::ConversationRepository;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Where a turn's frames go
pub struct TurnSink<'a> {
    pub renderer: &'a mut dyn FrameRenderer,
    pub out: &'a mut (dyn Write + Send),
    pub canvas: Option<&'a CanvasMaterializer>,
}

/// Run a turn, streaming its frames into `sink`.
pub async fn stream_turn<B, R>(
    use_case: &RunChatUseCase<B, R>,
    input: RunChatInput,
    sink: TurnSink<'_>,
    progress: &dyn ChatProgressNotifier,
) -> Result<RunChatOutput, ChatError>
where
    B: ModelBackend + 'static,
    R: ConversationRepository + ?Sized + 'static,
{
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling turn");
                cancel.cancel();
            }
        })
    };

    let (writer, mut stream) = frame_channel(use_case.params().frame_buffer);
    let TurnSink {
        renderer,
        out,
        canvas,
    } = sink;

    let render = async move {
        while let Some(frame) = stream.next().await {
            if let Some(canvas) = canvas {
                canvas.observe(&frame);
            }
            if let Some(text) = renderer.render(&frame) {
                write_out(out, &text);
            }
        }
        if let Some(text) = renderer.finish() {
            write_out(out, &text);
        }
    };

    let (result, ()) = tokio::join!(
        use_case.execute_with_progress(input, writer, cancel, progress),
        render
    );
    interrupt.abort();
    result
}

fn write_out(out: &mut (dyn Write + Send), text: &str) {
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        warn!("Failed to write output: {}", e);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::use_case;
    use super::*;
    use crate::output::NdjsonRenderer;
    use chatflow_application::NoChatProgress;

    #[tokio::test]
    async fn test_frames_written_in_order() {
        let use_case = use_case("Hello there");
        let mut renderer = NdjsonRenderer;
        let mut out: Vec<u8> = Vec::new();

        let output = stream_turn(
            &use_case,
            RunChatInput::new("alice", "hi"),
            TurnSink {
                renderer: &mut renderer,
                out: &mut out,
                canvas: None,
            },
            &NoChatProgress,
        )
        .await
        .unwrap();

        let types: Vec<String> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| {
                let frame: serde_json::Value = serde_json::from_str(l).unwrap();
                frame["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(types.first().map(String::as_str), Some("start"));
        assert!(types.contains(&"text-delta".to_string()));
        assert_eq!(types.last().map(String::as_str), Some("finish"));
        assert_eq!(output.assistant_message.text(), "Hello there");
        assert!(output.persisted);
    }
}
