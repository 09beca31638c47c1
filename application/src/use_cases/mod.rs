//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod assemble_tools;
pub mod record_confirmation;
pub mod run_chat;
pub(crate) mod shared;
pub(crate) mod tool_helpers;
