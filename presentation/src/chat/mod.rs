//! Interactive chat module
//!
//! One-shot turns and the reedline-based REPL share [`ChatDriver`], which
//! streams a turn to the terminal and walks manual-mode confirmations.

mod confirmation;
pub mod repl;
mod session;
pub mod turn;

pub use confirmation::InteractiveConfirmation;
pub use repl::{ChatRepl, RefreshHook, ReplCommand};
pub use session::{ChatDriver, ChatSession};
pub use turn::{TurnSink, stream_turn};
