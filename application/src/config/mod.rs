//! Application-level configuration.
//!
//! This module provides configuration types that control how use cases behave:
//!
//! - [`ChatParams`] - turn loop control (step cap, tool timeout, strictness)

pub mod chat_params;

pub use chat_params::ChatParams;
