//! System instructions for a chat turn

use serde::{Deserialize, Serialize};

use super::mention::MentionGuidance;

/// Instructions contributed by the agent a request targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInstructions {
    pub agent_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub instructions: String,
}

/// Templates for the chat system prompt
pub struct ChatPromptTemplate;

impl ChatPromptTemplate {
    /// Base system prompt
    pub fn base_system() -> &'static str {
        r#"You are a helpful assistant with access to tools.
Use a tool when it gives a better answer than you could produce from memory.
When you create a chart or table, describe briefly what it shows instead of repeating its data.
If a tool fails, explain the failure to the user and continue without it when possible."#
    }

    /// Full system prompt: base, optional agent instructions, then
    /// "Preferred tools" guidance rendered from mentions.
    pub fn system(
        base: Option<&str>,
        agent: Option<&AgentInstructions>,
        guidance: &MentionGuidance,
    ) -> String {
        let mut prompt = base.unwrap_or(Self::base_system()).trim_end().to_string();

        if let Some(agent) = agent {
            let title = agent.name.as_deref().unwrap_or(&agent.agent_id);
            prompt.push_str(&format!(
                "\n\n## Agent: {}\n\n{}",
                title,
                agent.instructions.trim()
            ));
        }

        if let Some(section) = guidance.render() {
            prompt.push_str("\n\n");
            prompt.push_str(&section);
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_without_extras_is_base() {
        let prompt = ChatPromptTemplate::system(None, None, &MentionGuidance::default());
        assert_eq!(prompt, ChatPromptTemplate::base_system());
    }

    #[test]
    fn test_system_with_agent() {
        let agent = AgentInstructions {
            agent_id: "analyst".to_string(),
            name: Some("Data Analyst".to_string()),
            instructions: "Prefer charts over tables.\n".to_string(),
        };
        let prompt =
            ChatPromptTemplate::system(Some("Base."), Some(&agent), &MentionGuidance::default());

        assert!(prompt.starts_with("Base."));
        assert!(prompt.contains("## Agent: Data Analyst"));
        assert!(prompt.ends_with("Prefer charts over tables."));
    }
}
