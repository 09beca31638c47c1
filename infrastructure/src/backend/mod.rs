//! Model backend adapters

mod openai;

pub use openai::{OpenAiBackend, SseDecoder, StepAssembler};
