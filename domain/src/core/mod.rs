//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`id`] - identifier generation for messages, calls and artifacts
//! - [`string`] - UTF-8 safe string helpers

pub mod error;
pub mod id;
pub mod string;
