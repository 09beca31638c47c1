//! Streamed response frames
//!
//! [`StreamFrame`] is the ordered, typed event sequence written to the
//! response channel of one chat turn.

pub mod frame;

pub use frame::StreamFrame;
