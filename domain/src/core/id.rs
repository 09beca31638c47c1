//! Identifier generation.
//!
//! All ids are opaque strings. Messages and tool calls coming from outside
//! (the client, the model backend) keep whatever id they arrived with; ids
//! minted here use a short prefix so they are recognizable in logs.

use uuid::Uuid;

/// Mint a new message id (`msg_<uuid>`).
pub fn new_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

/// Mint a new tool call id (`call_<uuid>`), used when a backend omits one.
pub fn new_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Mint a new thread id (`thread_<uuid>`).
pub fn new_thread_id() -> String {
    format!("thread_{}", Uuid::new_v4().simple())
}
