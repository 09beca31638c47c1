//! Stored workflow definitions.
//!
//! A workflow is an ordered list of nodes. Each node either calls an
//! in-process tool or produces a literal value. Inputs may reference the
//! workflow input and earlier node outputs with `{{input.x}}` and
//! `{{nodes.<id>.y}}` placeholders.
//!
//! ```toml
//! id = "wf_quarterly"
//! name = "quarterly_chart"
//! description = "Chart quarterly revenue"
//!
//! [input_schema]
//! type = "object"
//! required = ["year"]
//! properties.year = { type = "integer" }
//!
//! [[nodes]]
//! id = "now"
//! kind = "tool"
//! tool = "current_time"
//!
//! [[nodes]]
//! id = "chart"
//! kind = "tool"
//! tool = "create_bar_chart"
//!
//! [nodes.input]
//! title = "Revenue {{input.year}}"
//! labels = ["Q1", "Q2"]
//! series = [{ name = "rev", values = [1, 2] }]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::mcp::sanitize_tool_name;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<Value>,
    pub nodes: Vec<WorkflowNode>,
    /// Template for the workflow result. Defaults to the last node's output.
    #[serde(default)]
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(flatten)]
    pub action: NodeAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeAction {
    /// Call an in-process tool with a rendered input
    Tool {
        tool: String,
        #[serde(default = "empty_object")]
        input: Value,
    },
    /// Produce a rendered literal
    Value { value: Value },
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl WorkflowDefinition {
    /// Registry name of the tool exposing this workflow
    pub fn tool_name(&self) -> String {
        sanitize_tool_name(&self.name)
    }

    /// Structural checks: ids present and unique, placeholders only point
    /// at the input or at earlier nodes.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("workflow id must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("workflow name must not be empty".to_string());
        }
        if self.nodes.is_empty() {
            return Err("workflow has no nodes".to_string());
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err("node id must not be empty".to_string());
            }
            let template = match &node.action {
                NodeAction::Tool { input, .. } => input,
                NodeAction::Value { value } => value,
            };
            check_references(template, &seen).map_err(|r| format!("node '{}': {}", node.id, r))?;
            if !seen.insert(node.id.as_str()) {
                return Err(format!("duplicate node id '{}'", node.id));
            }
        }

        if let Some(output) = &self.output {
            check_references(output, &seen).map_err(|r| format!("output: {}", r))?;
        }
        Ok(())
    }
}

fn check_references(template: &Value, defined: &HashSet<&str>) -> Result<(), String> {
    for path in placeholders(template) {
        let mut segments = path.split('.');
        match (segments.next(), segments.next()) {
            (Some("input"), _) => {}
            (Some("nodes"), Some(node)) if defined.contains(node) => {}
            (Some("nodes"), Some(node)) => {
                return Err(format!("references node '{}' before it runs", node));
            }
            _ => return Err(format!("unknown placeholder '{{{{{}}}}}'", path)),
        }
    }
    Ok(())
}

/// Every `{{path}}` in a template, in order
pub fn placeholders(template: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(template, &mut found);
    found
}

fn collect_placeholders(template: &Value, found: &mut Vec<String>) {
    match template {
        Value::String(s) => {
            let mut rest = s.as_str();
            while let Some(start) = rest.find("{{") {
                let Some(len) = rest[start + 2..].find("}}") else {
                    break;
                };
                found.push(rest[start + 2..start + 2 + len].trim().to_string());
                rest = &rest[start + 2 + len + 2..];
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, found)),
        _ => {}
    }
}

/// Substitute placeholders using `scope` (`{"input": .., "nodes": {..}}`).
///
/// A string that is exactly one placeholder takes the referenced value with
/// its JSON type. Placeholders embedded in longer strings are replaced by
/// their text form.
pub fn render(template: &Value, scope: &Value) -> Result<Value, String> {
    match template {
        Value::String(s) => render_string(s, scope),
        Value::Array(items) => items
            .iter()
            .map(|v| render(v, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| render(v, scope).map(|v| (k.clone(), v)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

fn render_string(s: &str, scope: &Value) -> Result<Value, String> {
    let trimmed = s.trim();
    if trimmed.starts_with("{{")
        && trimmed.ends_with("}}")
        && trimmed.matches("{{").count() == 1
    {
        let path = trimmed[2..trimmed.len() - 2].trim();
        return lookup(scope, path).cloned();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        result.push_str(&rest[..start]);
        let path = rest[start + 2..start + 2 + len].trim();
        match lookup(scope, path)? {
            Value::String(text) => result.push_str(text),
            other => result.push_str(&other.to_string()),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    result.push_str(rest);
    Ok(Value::String(result))
}

fn lookup<'a>(scope: &'a Value, path: &str) -> Result<&'a Value, String> {
    path.split('.').try_fold(scope, |current, segment| {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        next.ok_or_else(|| format!("placeholder '{}' has no value", path))
    })
}
