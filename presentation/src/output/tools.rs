//! `--list-tools` / `/tools` listing

use chatflow_application::{AssembledTools, SourceStatus};
use chatflow_domain::ToolOrigin;
use chatflow_domain::core::string::truncate;
use colored::Colorize;
use std::fmt::Write;

const DESCRIPTION_WIDTH: usize = 72;

/// Human-readable listing of an assembled registry and its report
pub fn format_tool_list(tools: &AssembledTools) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", "Tools".bold(), tools.registry.len());

    for descriptor in tools.registry.descriptors() {
        let origin = match &descriptor.origin {
            ToolOrigin::ExternalProvider {
                provider_id,
                remote_tool_name,
                ..
            } => format!("provider {}:{}", provider_id, remote_tool_name),
            ToolOrigin::Workflow { workflow_id, .. } => format!("workflow {}", workflow_id),
            ToolOrigin::DefaultToolkit { toolkit } => format!("toolkit {}", toolkit),
        };
        let _ = writeln!(
            out,
            "  {:<28} {:<32} {}",
            descriptor.name().cyan(),
            origin.dimmed(),
            truncate(&descriptor.definition.description, DESCRIPTION_WIDTH)
        );
    }

    let _ = writeln!(out, "{}", "Sources".bold());
    for (kind, status) in &tools.report.sources {
        match status {
            SourceStatus::Resolved { offered, kept } => {
                let _ = writeln!(out, "  {:<18} {} offered, {} kept", kind.as_str(), offered, kept);
            }
            SourceStatus::Failed { message } => {
                let _ = writeln!(out, "  {:<18} {} {}", kind.as_str(), "failed:".red(), message);
            }
        }
    }
    if tools.report.filtered_out > 0 {
        let _ = writeln!(out, "  {} provider tool(s) not permitted", tools.report.filtered_out);
    }
    if !tools.report.collisions.is_empty() {
        let _ = writeln!(out, "  shadowed: {}", tools.report.collisions.join(", "));
    }
    out
}
