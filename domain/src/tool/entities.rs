//! Tool domain entities

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::toolkit::Toolkit;

/// The three kinds of tool source that contribute to a registry.
///
/// Ordering matters: on a name collision the source with the higher
/// [`precedence`](Self::precedence) keeps the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSourceKind {
    /// Remote provider reached over the list-tools / call-tool protocol
    ExternalProvider,
    /// Stored workflow definition exposed as a single tool
    Workflow,
    /// Statically registered in-process toolkit
    DefaultToolkit,
}

impl ToolSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolSourceKind::ExternalProvider => "external_provider",
            ToolSourceKind::Workflow => "workflow",
            ToolSourceKind::DefaultToolkit => "default_toolkit",
        }
    }

    /// Collision precedence (higher wins). Default toolkit code is trusted
    /// process code and always keeps its names.
    pub fn precedence(&self) -> u8 {
        match self {
            ToolSourceKind::ExternalProvider => 0,
            ToolSourceKind::Workflow => 1,
            ToolSourceKind::DefaultToolkit => 2,
        }
    }
}

impl std::fmt::Display for ToolSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a tool came from, with the source-specific metadata needed for
/// permission filtering and per-origin lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ToolOrigin {
    ExternalProvider {
        /// Id of the remote provider that defines the tool
        provider_id: String,
        /// Display name of the provider
        provider_name: String,
        /// Tool name as the remote provider knows it
        remote_tool_name: String,
    },
    Workflow {
        workflow_id: String,
        workflow_name: String,
    },
    DefaultToolkit {
        toolkit: Toolkit,
    },
}

impl ToolOrigin {
    pub fn kind(&self) -> ToolSourceKind {
        match self {
            ToolOrigin::ExternalProvider { .. } => ToolSourceKind::ExternalProvider,
            ToolOrigin::Workflow { .. } => ToolSourceKind::Workflow,
            ToolOrigin::DefaultToolkit { .. } => ToolSourceKind::DefaultToolkit,
        }
    }

    /// Id of the originating source (provider id or workflow id)
    pub fn source_id(&self) -> Option<&str> {
        match self {
            ToolOrigin::ExternalProvider { provider_id, .. } => Some(provider_id),
            ToolOrigin::Workflow { workflow_id, .. } => Some(workflow_id),
            ToolOrigin::DefaultToolkit { .. } => None,
        }
    }

    /// Name of the tool at its origin, when it differs from the registry name
    pub fn origin_tool_name(&self) -> Option<&str> {
        match self {
            ToolOrigin::ExternalProvider {
                remote_tool_name, ..
            } => Some(remote_tool_name),
            _ => None,
        }
    }
}

/// Definition of a tool that can be offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool within a registry (e.g., "create_bar_chart")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the tool input (always an object schema)
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Add a property to the object schema (builder pattern)
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        let name = name.into();
        if !self.input_schema.is_object() {
            self.input_schema = json!({ "type": "object" });
        }
        let Some(schema) = self.input_schema.as_object_mut() else {
            return self;
        };

        let properties = schema
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(props) = properties {
            props.insert(
                name.clone(),
                json!({ "type": param_type, "description": description.into() }),
            );
        }

        if required {
            let required_list = schema
                .entry("required")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = required_list {
                list.push(Value::String(name));
            }
        }
        self
    }

    /// Names of required properties declared by the schema
    pub fn required_properties(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|list| list.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// A call to a tool proposed by the model (the ToolCallRecord).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned id used to correlate with the result
    pub call_id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Structured input, normally a JSON object
    pub input: Value,
}

impl ToolCall {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            input: Value::Object(Map::new()),
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.input.is_object() {
            self.input = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.input {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument or return an error message
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    /// Get an optional i64 argument
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.input.get(key).and_then(|v| v.as_i64())
    }

    /// Get an optional bool argument
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.input.get(key).and_then(|v| v.as_bool())
    }
}
