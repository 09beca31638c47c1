//! Interactive confirmation of manual-mode tool calls.
//!
//! When a manual turn ends with tool calls awaiting confirmation, the user
//! sees each call before the next turn runs:
//!
//! ```text
//! ───────────────────────────────────────────────────────────────
//!   Tool call needs confirmation
//! ───────────────────────────────────────────────────────────────
//!
//! Tool:   fetch_url
//!         Fetch a web page and return its readable text
//! Input:
//!   {
//!     "url": "https://example.com"
//!   }
//!
//! [y]es / [n]o / [q]uit >
//! ```
//!
//! | Answer | Aliases | Effect |
//! |--------|---------|--------|
//! | `y` | `yes`, `/approve`, `a` | Run the call on the next turn |
//! | `n` | `no`, `/reject`, `r` | Reject; the model sees a fixed rejection notice |
//! | `q` | `quit`, EOF | Stop asking (this and remaining calls are rejected) |

use async_trait::async_trait;
use chatflow_application::{ConfirmationError, ConfirmationPort};
use chatflow_domain::{ToolCall, ToolDefinition};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Terminal-based [`ConfirmationPort`]
pub struct InteractiveConfirmation;

/// A parsed answer to the confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Approve,
    Reject,
    Quit,
}

impl InteractiveConfirmation {
    pub fn new() -> Self {
        Self
    }

    fn display_prompt(&self, call: &ToolCall, definition: Option<&ToolDefinition>) {
        let rule = "───────────────────────────────────────────────────────────────";
        println!();
        println!("{}", rule.yellow());
        println!("{}", "  Tool call needs confirmation".yellow().bold());
        println!("{}", rule.yellow());
        println!();
        println!("{} {}", "Tool:".cyan().bold(), call.tool_name.bold());
        if let Some(definition) = definition
            && !definition.description.is_empty()
        {
            println!("      {}", definition.description.dimmed());
        }
        println!("{}", "Input:".cyan().bold());
        let input =
            serde_json::to_string_pretty(&call.input).unwrap_or_else(|_| call.input.to_string());
        for line in input.lines() {
            println!("  {}", line);
        }
        println!();
    }

    fn read_answer(&self) -> Result<Option<String>, ConfirmationError> {
        print!("{} ", "[y]es / [n]o / [q]uit >".magenta().bold());
        io::stdout()
            .flush()
            .map_err(|e| ConfirmationError::IoError(format!("Failed to flush stdout: {}", e)))?;

        let mut input = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| ConfirmationError::IoError(format!("Failed to read input: {}", e)))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }
}

impl Default for InteractiveConfirmation {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_answer(input: &str) -> Option<Answer> {
    match input.to_lowercase().as_str() {
        "y" | "yes" | "/approve" | "approve" | "a" => Some(Answer::Approve),
        "n" | "no" | "/reject" | "reject" | "r" => Some(Answer::Reject),
        "q" | "quit" | "/quit" => Some(Answer::Quit),
        _ => None,
    }
}

#[async_trait]
impl ConfirmationPort for InteractiveConfirmation {
    async fn confirm(
        &self,
        call: &ToolCall,
        definition: Option<&ToolDefinition>,
    ) -> Result<bool, ConfirmationError> {
        self.display_prompt(call, definition);

        loop {
            let Some(input) = self.read_answer()? else {
                return Err(ConfirmationError::Cancelled);
            };
            if input.is_empty() {
                continue;
            }

            match parse_answer(&input) {
                Some(Answer::Approve) => {
                    println!("{}", "✓ Approved".green());
                    return Ok(true);
                }
                Some(Answer::Reject) => {
                    println!("{}", "✗ Rejected".red());
                    return Ok(false);
                }
                Some(Answer::Quit) => return Err(ConfirmationError::Cancelled),
                None => {
                    println!("{} Unknown answer: {}", "⚠".yellow(), input.red());
                    println!("Answer y, n or q.");
                }
            }
        }
    }
}
