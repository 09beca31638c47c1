//! Tool input validation
//!
//! Pure checks of a [`ToolCall`]'s input against the JSON schema declared by
//! its [`ToolDefinition`]. Only the subset of JSON Schema that tool
//! definitions use in practice is understood: `required`, primitive `type`,
//! `enum` and `additionalProperties: false`. Anything else is accepted.

use serde_json::Value;

use super::entities::{ToolCall, ToolDefinition};

/// Validator for tool calls
///
/// This is a pure domain trait that validates tool calls
/// against their definitions without any I/O operations.
pub trait ToolValidator: Send + Sync {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String>;
}

/// Validator that understands the common JSON schema keywords
#[derive(Debug, Clone, Default)]
pub struct SchemaToolValidator;

impl ToolValidator for SchemaToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String> {
        let empty = serde_json::Map::new();
        let input = match &call.input {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(format!(
                    "Input for tool '{}' must be an object, got {}",
                    definition.name,
                    json_type_name(other)
                ));
            }
        };

        for param in definition.required_properties() {
            if !input.contains_key(param) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param, definition.name
                ));
            }
        }

        let properties = definition
            .input_schema
            .get("properties")
            .and_then(|p| p.as_object());
        let closed = definition
            .input_schema
            .get("additionalProperties")
            .and_then(|v| v.as_bool())
            == Some(false);

        for (key, value) in input {
            let Some(prop_schema) = properties.and_then(|p| p.get(key)) else {
                if closed {
                    return Err(format!(
                        "Unknown parameter '{}' for tool '{}'",
                        key, definition.name
                    ));
                }
                continue;
            };

            if let Some(expected) = prop_schema.get("type") {
                if !type_matches(expected, value) {
                    return Err(format!(
                        "Parameter '{}' for tool '{}' must be {}, got {}",
                        key,
                        definition.name,
                        describe_type(expected),
                        json_type_name(value)
                    ));
                }
            }

            if let Some(allowed) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !allowed.contains(value) {
                    return Err(format!(
                        "Parameter '{}' for tool '{}' must be one of {}",
                        key,
                        definition.name,
                        Value::Array(allowed.clone())
                    ));
                }
            }
        }

        Ok(())
    }
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(t) => single_type_matches(t, value),
        Value::Array(types) => types
            .iter()
            .filter_map(|t| t.as_str())
            .any(|t| single_type_matches(t, value)),
        _ => true,
    }
}

fn single_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type keywords are not ours to enforce
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart_definition() -> ToolDefinition {
        ToolDefinition::new("create_bar_chart", "Bar chart")
            .with_property("title", "string", "Chart title", true)
            .with_property("values", "array", "Data values", true)
            .with_property("stacked", "boolean", "Stack series", false)
    }

    #[test]
    fn test_validator_missing_required() {
        let validator = SchemaToolValidator;
        let call = ToolCall::new("c1", "create_bar_chart").with_arg("title", "Sales");

        let result = validator.validate(&call, &chart_definition());
        assert!(result.unwrap_err().contains("Missing required parameter 'values'"));
    }

    #[test]
    fn test_validator_wrong_type() {
        let validator = SchemaToolValidator;
        let call = ToolCall::new("c1", "create_bar_chart")
            .with_arg("title", 42)
            .with_arg("values", json!([1, 2]));

        let err = validator.validate(&call, &chart_definition()).unwrap_err();
        assert!(err.contains("must be string"));
    }

    #[test]
    fn test_validator_additional_properties() {
        let validator = SchemaToolValidator;
        let open = chart_definition();
        let call = ToolCall::new("c1", "create_bar_chart")
            .with_arg("title", "t")
            .with_arg("values", json!([]))
            .with_arg("extra", "x");
        assert!(validator.validate(&call, &open).is_ok());

        let mut schema = open.input_schema.clone();
        schema["additionalProperties"] = json!(false);
        let closed = open.with_input_schema(schema);
        assert!(validator
            .validate(&call, &closed)
            .unwrap_err()
            .contains("Unknown parameter 'extra'"));
    }

    #[test]
    fn test_validator_enum_and_null_input() {
        let validator = SchemaToolValidator;
        let def = ToolDefinition::new("now", "Current time").with_input_schema(json!({
            "type": "object",
            "properties": { "format": { "type": "string", "enum": ["iso", "unix"] } }
        }));

        assert!(validator.validate(&ToolCall::new("c", "now"), &def).is_ok());

        let bad = ToolCall::new("c", "now").with_arg("format", "rfc");
        assert!(validator.validate(&bad, &def).unwrap_err().contains("one of"));
    }

    #[test]
    fn test_validator_rejects_non_object_input() {
        let call = ToolCall::new("c", "create_bar_chart").with_input(json!([1]));
        let err = SchemaToolValidator
            .validate(&call, &chart_definition())
            .unwrap_err();
        assert!(err.contains("must be an object"));
    }
}
