//! Execution value objects

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::error::DomainError;

/// How tools are bound for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    /// The model decides; tools execute immediately
    #[default]
    Auto,
    /// No tools are offered
    None,
    /// Tools are offered schema-only; execution waits for user consent
    Manual,
}

impl ToolChoiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoiceMode::Auto => "auto",
            ToolChoiceMode::None => "none",
            ToolChoiceMode::Manual => "manual",
        }
    }

    pub fn offers_tools(&self) -> bool {
        !matches!(self, ToolChoiceMode::None)
    }

    pub fn executes_immediately(&self) -> bool {
        matches!(self, ToolChoiceMode::Auto)
    }
}

impl std::fmt::Display for ToolChoiceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolChoiceMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ToolChoiceMode::Auto),
            "none" | "off" => Ok(ToolChoiceMode::None),
            "manual" | "confirm" => Ok(ToolChoiceMode::Manual),
            other => Err(DomainError::InvalidToolChoice(other.to_string())),
        }
    }
}

/// Why a step (or the whole turn) stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Model produced a final answer
    Stop,
    /// Model requested tool calls; the loop continues
    ToolCalls,
    /// Output token limit reached
    Length,
    /// Backend refused the content
    ContentFilter,
    /// The step cap was reached. Not an error.
    StepLimit,
    /// The request's cancellation signal fired
    Cancelled,
    /// The turn ended because of an error
    Error,
    /// Backend reported something we do not recognize
    Other,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool-calls",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content-filter",
            FinishReason::StepLimit => "step-limit",
            FinishReason::Cancelled => "cancelled",
            FinishReason::Error => "error",
            FinishReason::Other => "other",
        }
    }

    /// Map a backend finish reason string (OpenAI-style) to a domain value
    pub fn from_backend(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" => FinishReason::Stop,
            "tool_calls" | "tool-calls" | "tool_use" | "function_call" => FinishReason::ToolCalls,
            "length" | "max_tokens" => FinishReason::Length,
            "content_filter" | "content-filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }

    /// Whether the loop should run another step after this one
    pub fn continues_loop(&self) -> bool {
        matches!(self, FinishReason::ToolCalls)
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token usage, summed across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
