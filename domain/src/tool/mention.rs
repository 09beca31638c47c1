//! Mentions - request-scoped references to tools, providers, workflows or agents.
//!
//! Mentions are guidance for the model. They are rendered into the system
//! instructions and never used to filter the registry.

use serde::{Deserialize, Serialize};

/// A reference attached to an inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mention {
    /// An external provider, optionally narrowed to one of its tools
    Provider {
        provider_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
    },
    /// A stored workflow
    Workflow {
        workflow_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Another agent whose expertise should be consulted
    Agent {
        agent_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// A default toolkit tool by registry name
    DefaultTool { name: String },
}

impl Mention {
    /// Short label used in prompt guidance and logs
    pub fn label(&self) -> String {
        match self {
            Mention::Provider {
                provider_id,
                tool_name: Some(tool),
            } => format!("{} (provider {})", tool, provider_id),
            Mention::Provider { provider_id, .. } => format!("tools from provider {}", provider_id),
            Mention::Workflow {
                name: Some(name), ..
            } => format!("workflow {}", name),
            Mention::Workflow { workflow_id, .. } => format!("workflow {}", workflow_id),
            Mention::Agent { name: Some(name), .. } => format!("agent {}", name),
            Mention::Agent { agent_id, .. } => format!("agent {}", agent_id),
            Mention::DefaultTool { name } => name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_deserializes_tagged() {
        let json = r#"{"type":"provider","provider_id":"github","tool_name":"search"}"#;
        let mention: Mention = serde_json::from_str(json).unwrap();
        assert_eq!(
            mention,
            Mention::Provider {
                provider_id: "github".to_string(),
                tool_name: Some("search".to_string())
            }
        );
    }

    #[test]
    fn test_labels() {
        let m = Mention::DefaultTool {
            name: "create_bar_chart".to_string(),
        };
        assert_eq!(m.label(), "create_bar_chart");

        let m = Mention::Workflow {
            workflow_id: "wf_1".to_string(),
            name: None,
        };
        assert_eq!(m.label(), "workflow wf_1");
    }
}
