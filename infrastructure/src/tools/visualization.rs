//! Visualization toolkit: charts and tables rendered on the canvas.
//!
//! Every tool reports `pending` as soon as it starts, then one `partial`
//! per progressive stage (series by series, or row batches for tables),
//! and finally returns `{status: "complete", id, title, payload}`.
//! The `id` is derived from the call id so retries of the same call update
//! the same artifact.

use async_trait::async_trait;
use chatflow_application::{ToolContext, ToolExecutor};
use chatflow_domain::{ToolCall, ToolDefinition, ToolError};
use serde_json::{Value, json};

pub const CREATE_BAR_CHART: &str = "create_bar_chart";
pub const CREATE_LINE_CHART: &str = "create_line_chart";
pub const CREATE_PIE_CHART: &str = "create_pie_chart";
pub const CREATE_TABLE: &str = "create_table";

/// Rows per partial update of a table
const TABLE_BATCH: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Bar,
    Line,
    Pie,
    Table,
}

impl VisualKind {
    pub const ALL: [VisualKind; 4] = [
        VisualKind::Bar,
        VisualKind::Line,
        VisualKind::Pie,
        VisualKind::Table,
    ];

    pub fn tool_name(&self) -> &'static str {
        match self {
            VisualKind::Bar => CREATE_BAR_CHART,
            VisualKind::Line => CREATE_LINE_CHART,
            VisualKind::Pie => CREATE_PIE_CHART,
            VisualKind::Table => CREATE_TABLE,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        let series_schema = json!({
            "type": "array",
            "description": "Data series; each has a name and one value per label",
            "items": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "values": {"type": "array", "items": {"type": "number"}}
                },
                "required": ["name", "values"]
            }
        });

        match self {
            VisualKind::Bar | VisualKind::Line => {
                let description = if *self == VisualKind::Bar {
                    "Render a bar chart on the canvas. Use for comparing values across categories."
                } else {
                    "Render a line chart on the canvas. \
                     Use for values that change over an ordered axis such as time."
                };
                ToolDefinition::new(self.tool_name(), description).with_input_schema(json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "Chart title"},
                        "labels": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Category or x-axis labels"
                        },
                        "series": series_schema,
                        "x_label": {"type": "string", "description": "X axis caption"},
                        "y_label": {"type": "string", "description": "Y axis caption"}
                    },
                    "required": ["title", "labels", "series"]
                }))
            }
            VisualKind::Pie => ToolDefinition::new(
                self.tool_name(),
                "Render a pie chart on the canvas. Use for parts of a whole.",
            )
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Chart title"},
                    "slices": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "label": {"type": "string"},
                                "value": {"type": "number"}
                            },
                            "required": ["label", "value"]
                        }
                    }
                },
                "required": ["title", "slices"]
            })),
            VisualKind::Table => {
                ToolDefinition::new(self.tool_name(), "Render a table on the canvas.")
                    .with_input_schema(json!({
                        "type": "object",
                        "properties": {
                            "title": {"type": "string", "description": "Table title"},
                            "columns": {"type": "array", "items": {"type": "string"}},
                            "rows": {
                                "type": "array",
                                "items": {"type": "array"},
                                "description": "One array of cells per row"
                            }
                        },
                        "required": ["title", "columns", "rows"]
                    }))
            }
        }
    }

    /// Progressive payloads for a call. The last stage is the final payload.
    fn stages(&self, call: &ToolCall) -> Result<Vec<Value>, ToolError> {
        match self {
            VisualKind::Bar | VisualKind::Line => series_stages(*self, call),
            VisualKind::Pie => pie_stages(call),
            VisualKind::Table => table_stages(call),
        }
    }
}

/// Executor for one visualization tool
pub struct VisualizationTool {
    kind: VisualKind,
}

impl VisualizationTool {
    pub fn new(kind: VisualKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl ToolExecutor for VisualizationTool {
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<Value, ToolError> {
        let id = artifact_id(&ctx.call_id);
        let title = call
            .require_string("title")
            .map_err(ToolError::invalid_argument)?
            .to_string();

        let mut tracker = ctx.tracker(self.kind.tool_name());
        let progress_error = |e: chatflow_domain::tool::progress::ProgressTransitionError| {
            ToolError::execution_failed(e.to_string())
        };

        ctx.progress.report(
            tracker
                .pending(json!({"id": id, "title": title}))
                .map_err(progress_error)?,
        );

        let stages = self.kind.stages(call)?;
        let Some((last, partials)) = stages.split_last() else {
            return Err(ToolError::invalid_argument("nothing to render"));
        };

        for payload in partials {
            if ctx.is_cancelled() {
                return Err(ToolError::cancelled());
            }
            ctx.progress.report(
                tracker
                    .partial(json!({"id": id, "title": title, "payload": payload}))
                    .map_err(progress_error)?,
            );
            tokio::task::yield_now().await;
        }
        tracker.finish().map_err(progress_error)?;

        Ok(json!({
            "status": "complete",
            "id": id,
            "title": title,
            "payload": last,
        }))
    }
}

pub fn artifact_id(call_id: &str) -> String {
    format!("artifact_{}", call_id)
}

fn array_arg<'a>(call: &'a ToolCall, key: &str) -> Result<&'a Vec<Value>, ToolError> {
    call.input
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ToolError::invalid_argument(format!("'{}' must be an array", key)))
}

fn series_stages(kind: VisualKind, call: &ToolCall) -> Result<Vec<Value>, ToolError> {
    let labels = array_arg(call, "labels")?;
    let series = array_arg(call, "series")?;
    if series.is_empty() {
        return Err(ToolError::invalid_argument("'series' must not be empty"));
    }

    for entry in series {
        let name = entry.get("name").and_then(|n| n.as_str()).unwrap_or("?");
        let values = entry
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ToolError::invalid_argument(format!("series '{}' has no values", name))
            })?;
        if values.len() != labels.len() {
            return Err(ToolError::invalid_argument(format!(
                "series '{}' has {} values for {} labels",
                name,
                values.len(),
                labels.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_number()) {
            return Err(ToolError::invalid_argument(format!(
                "series '{}' contains a non-numeric value: {}",
                name, bad
            )));
        }
    }

    let chart_type = if kind == VisualKind::Bar { "bar" } else { "line" };
    let stages = (1..=series.len())
        .map(|n| {
            json!({
                "type": chart_type,
                "labels": labels,
                "series": &series[..n],
                "x_label": call.get_string("x_label"),
                "y_label": call.get_string("y_label"),
            })
        })
        .collect();
    Ok(stages)
}

fn pie_stages(call: &ToolCall) -> Result<Vec<Value>, ToolError> {
    let slices = array_arg(call, "slices")?;
    if slices.is_empty() {
        return Err(ToolError::invalid_argument("'slices' must not be empty"));
    }

    let mut total = 0.0;
    for slice in slices {
        let value = slice
            .get("value")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ToolError::invalid_argument("every slice needs a numeric 'value'"))?;
        if value < 0.0 {
            return Err(ToolError::invalid_argument("slice values must not be negative"));
        }
        total += value;
    }

    Ok(vec![json!({"type": "pie", "slices": slices, "total": total})])
}

fn table_stages(call: &ToolCall) -> Result<Vec<Value>, ToolError> {
    let columns = array_arg(call, "columns")?;
    let rows = array_arg(call, "rows")?;

    for (index, row) in rows.iter().enumerate() {
        let width = row.as_array().map(Vec::len).unwrap_or(0);
        if width != columns.len() {
            return Err(ToolError::invalid_argument(format!(
                "row {} has {} cells for {} columns",
                index,
                width,
                columns.len()
            )));
        }
    }

    if rows.is_empty() {
        return Ok(vec![json!({"type": "table", "columns": columns, "rows": []})]);
    }

    let mut stages = Vec::new();
    let mut shown = 0;
    while shown < rows.len() {
        shown = (shown + TABLE_BATCH).min(rows.len());
        stages.push(json!({"type": "table", "columns": columns, "rows": &rows[..shown]}));
    }
    Ok(stages)
}
