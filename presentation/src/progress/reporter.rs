//! Progress reporting for chat turns

use chatflow_application::ChatProgressNotifier;
use chatflow_domain::FinishReason;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Shows a spinner on stderr while the model or a tool is working.
///
/// The spinner is cleared as soon as text starts streaming so it never
/// interleaves with the answer on stdout.
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn set(&self, prefix: String, message: String) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        let spinner = slot.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        spinner.set_prefix(prefix);
        spinner.set_message(message);
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.spinner.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatProgressNotifier for ProgressReporter {
    fn on_step_start(&self, index: usize, max_steps: usize) {
        self.set(
            format!("Step {}/{}", index + 1, max_steps),
            "Thinking...".to_string(),
        );
    }

    fn on_text_chunk(&self, _chunk: &str) {
        self.clear();
    }

    fn on_tool_call(&self, tool_name: &str, _preview: &str) {
        self.set("Tool".to_string(), format!("Running {}...", tool_name));
    }

    fn on_tool_result(&self, _tool_name: &str, _success: bool) {
        self.set("Tool".to_string(), "Waiting for model...".to_string());
    }

    fn on_turn_end(&self, _finish_reason: FinishReason) {
        self.clear();
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Simple text-based progress (no spinner), written to stderr
pub struct SimpleProgress;

impl ChatProgressNotifier for SimpleProgress {
    fn on_registry_assembled(&self, tool_count: usize) {
        eprintln!("{} {} tools available", "->".cyan(), tool_count);
    }

    fn on_tool_not_found(&self, tool_name: &str, available_tools: &[&str]) {
        eprintln!(
            "  {} unknown tool {} (available: {})",
            "x".red(),
            tool_name.bold(),
            available_tools.join(", ")
        );
    }

    fn on_tool_deferred(&self, tool_name: &str) {
        eprintln!("  {} {} awaits confirmation", "?".yellow(), tool_name);
    }

    fn on_turn_end(&self, finish_reason: FinishReason) {
        if matches!(finish_reason, FinishReason::StepLimit) {
            eprintln!("{} step limit reached", "!".yellow());
        }
    }
}
