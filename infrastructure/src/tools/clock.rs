//! clock toolkit: `current_time` and `shift_time`

use async_trait::async_trait;
use chatflow_application::{ToolContext, ToolExecutor};
use chatflow_domain::{ToolCall, ToolDefinition, ToolError};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde_json::{Value, json};

pub const CURRENT_TIME: &str = "current_time";
pub const SHIFT_TIME: &str = "shift_time";

/// Largest offset chrono accepts, in minutes (just under 24h)
const MAX_OFFSET_MINUTES: i64 = 24 * 60 - 1;

pub fn current_time_definition() -> ToolDefinition {
    ToolDefinition::new(
        CURRENT_TIME,
        "Get the current date and time. \
         Use before answering questions about today, now, or relative dates.",
    )
    .with_property(
        "utc_offset_minutes",
        "integer",
        "Offset from UTC in minutes (e.g. 540 for UTC+9). Defaults to 0.",
        false,
    )
}

pub fn shift_time_definition() -> ToolDefinition {
    ToolDefinition::new(
        SHIFT_TIME,
        "Add or subtract days, hours and minutes from an RFC 3339 timestamp.",
    )
    .with_property("timestamp", "string", "RFC 3339 timestamp, e.g. 2024-05-01T12:00:00Z", true)
    .with_property("days", "integer", "Days to add (negative to subtract)", false)
    .with_property("hours", "integer", "Hours to add (negative to subtract)", false)
    .with_property("minutes", "integer", "Minutes to add (negative to subtract)", false)
}

pub struct CurrentTimeTool;

#[async_trait]
impl ToolExecutor for CurrentTimeTool {
    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let offset_minutes = call.get_i64("utc_offset_minutes").unwrap_or(0);
        let offset = fixed_offset(offset_minutes)?;
        Ok(describe(Utc::now().with_timezone(&offset)))
    }
}

pub struct ShiftTimeTool;

#[async_trait]
impl ToolExecutor for ShiftTimeTool {
    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let raw = call.require_string("timestamp").map_err(ToolError::invalid_argument)?;
        let start = DateTime::parse_from_rfc3339(raw).map_err(|e| {
            ToolError::invalid_argument(format!("Invalid timestamp '{}': {}", raw, e))
        })?;

        let delta = [
            call.get_i64("days").map(Duration::try_days),
            call.get_i64("hours").map(Duration::try_hours),
            call.get_i64("minutes").map(Duration::try_minutes),
        ]
        .into_iter()
        .flatten()
        .try_fold(Duration::zero(), |acc, part| {
            part.and_then(|d| acc.checked_add(&d))
        })
        .ok_or_else(|| ToolError::invalid_argument("Shift is out of range"))?;

        let shifted = start
            .checked_add_signed(delta)
            .ok_or_else(|| ToolError::invalid_argument("Resulting time is out of range"))?;
        Ok(describe(shifted))
    }
}

fn fixed_offset(minutes: i64) -> Result<FixedOffset, ToolError> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(ToolError::invalid_argument(format!(
            "utc_offset_minutes must be within ±{}",
            MAX_OFFSET_MINUTES
        )));
    }
    FixedOffset::east_opt((minutes * 60) as i32)
        .ok_or_else(|| ToolError::invalid_argument("Invalid UTC offset"))
}

fn describe(time: DateTime<FixedOffset>) -> Value {
    json!({
        "iso": time.to_rfc3339(),
        "unix": time.timestamp(),
        "date": time.format("%Y-%m-%d").to_string(),
        "time": time.format("%H:%M:%S").to_string(),
        "weekday": time.format("%A").to_string(),
        "utc_offset": time.offset().to_string(),
    })
}
