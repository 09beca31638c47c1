//! Chat loop configuration from TOML (`[chat]` section)

use chatflow_application::ChatParams;
use chatflow_domain::{ConfigIssue, ConfigIssueCode, ToolChoiceMode, ToolkitSelection};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw chat configuration from TOML
///
/// # Example
///
/// ```toml
/// [chat]
/// max_steps = 10
/// tool_timeout_secs = 60
/// tool_choice = "auto"          # "auto", "none", "manual"
/// strict_assembly = false       # surface tool source failures
/// default_toolkits = ["visualization", "clock"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChatConfig {
    pub max_steps: usize,
    pub tool_timeout_secs: u64,
    pub tool_choice: String,
    pub strict_assembly: bool,
    /// Toolkits enabled when a request names none. Unset means all.
    pub default_toolkits: Option<Vec<String>>,
    /// Replaces the built-in base system prompt
    pub system_prompt: Option<String>,
}

impl Default for FileChatConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout_secs: 60,
            tool_choice: "auto".to_string(),
            strict_assembly: false,
            default_toolkits: None,
            system_prompt: None,
        }
    }
}

impl FileChatConfig {
    /// Parse tool_choice into a [`ToolChoiceMode`], falling back to `auto`.
    pub fn parse_tool_choice(&self) -> (ToolChoiceMode, Vec<ConfigIssue>) {
        match self.tool_choice.parse::<ToolChoiceMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "chat.tool_choice".to_string(),
                        value: self.tool_choice.clone(),
                        valid_values: vec![
                            "auto".to_string(),
                            "none".to_string(),
                            "manual".to_string(),
                        ],
                    },
                    format!(
                        "chat.tool_choice: unknown value '{}', falling back to 'auto'",
                        self.tool_choice
                    ),
                );
                (ToolChoiceMode::default(), vec![issue])
            }
        }
    }

    /// Parse default_toolkits. Unknown names are dropped with a warning.
    pub fn parse_toolkits(&self) -> (ToolkitSelection, Vec<ConfigIssue>) {
        let (selection, unknown) = ToolkitSelection::from_names(self.default_toolkits.as_deref());
        let issues = unknown
            .into_iter()
            .map(|name| {
                ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "chat.default_toolkits".to_string(),
                        value: name.clone(),
                        valid_values: vec![
                            "visualization".to_string(),
                            "http".to_string(),
                            "clock".to_string(),
                        ],
                    },
                    format!("chat.default_toolkits: unknown toolkit '{}' ignored", name),
                )
            })
            .collect();
        (selection, issues)
    }

    /// Convert to application-level loop parameters
    pub fn to_chat_params(&self) -> ChatParams {
        let params = ChatParams::default()
            .with_max_steps(self.max_steps)
            .with_tool_timeout(Duration::from_secs(self.tool_timeout_secs.max(1)))
            .with_strict_assembly(self.strict_assembly);
        match &self.system_prompt {
            Some(prompt) if !prompt.trim().is_empty() => params.with_system_prompt(prompt),
            _ => params,
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.parse_tool_choice().1);
        issues.extend(self.parse_toolkits().1);

        if self.max_steps == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "chat.max_steps".to_string(),
                },
                "chat.max_steps is 0, using 1",
            ));
        }
        if self.tool_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::OutOfRange {
                    field: "chat.tool_timeout_secs".to_string(),
                },
                "chat.tool_timeout_secs cannot be 0",
            ));
        }
        issues
    }
}
