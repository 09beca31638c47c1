//! Mention guidance
//!
//! Mentions never filter the registry. They are matched against the
//! assembled catalog and rendered as a "Preferred tools" section so the
//! model knows what the user pointed at.

use crate::tool::entities::ToolOrigin;
use crate::tool::mention::Mention;

/// Minimal view of a registry entry needed to match mentions
#[derive(Debug, Clone, Copy)]
pub struct ToolCatalogEntry<'a> {
    pub name: &'a str,
    pub origin: &'a ToolOrigin,
}

/// Mentions resolved against a catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionGuidance {
    /// Registry tool names the user pointed at, in mention order
    pub preferred_tools: Vec<String>,
    /// Agents whose perspective was requested
    pub agents: Vec<String>,
    /// Mentions that matched nothing in the catalog
    pub unmatched: Vec<Mention>,
}

impl MentionGuidance {
    pub fn resolve(mentions: &[Mention], catalog: &[ToolCatalogEntry<'_>]) -> Self {
        let mut guidance = Self::default();

        for mention in mentions {
            let matched: Vec<&str> = match mention {
                Mention::Provider {
                    provider_id,
                    tool_name,
                } => catalog
                    .iter()
                    .filter(|entry| match entry.origin {
                        ToolOrigin::ExternalProvider {
                            provider_id: pid,
                            remote_tool_name,
                            ..
                        } => {
                            pid == provider_id
                                && tool_name.as_deref().is_none_or(|t| {
                                    t == remote_tool_name.as_str() || t == entry.name
                                })
                        }
                        _ => false,
                    })
                    .map(|entry| entry.name)
                    .collect(),
                Mention::Workflow { workflow_id, .. } => catalog
                    .iter()
                    .filter(|entry| {
                        matches!(
                            entry.origin,
                            ToolOrigin::Workflow { workflow_id: wid, .. } if wid == workflow_id
                        )
                    })
                    .map(|entry| entry.name)
                    .collect(),
                Mention::DefaultTool { name } => catalog
                    .iter()
                    .filter(|entry| entry.name == name)
                    .map(|entry| entry.name)
                    .collect(),
                Mention::Agent { .. } => {
                    guidance.agents.push(mention.label());
                    continue;
                }
            };

            if matched.is_empty() {
                guidance.unmatched.push(mention.clone());
            }
            for name in matched {
                if !guidance.preferred_tools.iter().any(|t| t == name) {
                    guidance.preferred_tools.push(name.to_string());
                }
            }
        }

        guidance
    }

    pub fn is_empty(&self) -> bool {
        self.preferred_tools.is_empty() && self.agents.is_empty()
    }

    /// Render the prompt section, or `None` when there is nothing to say
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        let mut section = String::from(
            "## Preferred tools\n\n\
             The user explicitly referenced the following. \
             Prefer them when they fit the request:\n",
        );
        for name in &self.preferred_tools {
            section.push_str(&format!("- `{}`\n", name));
        }
        for agent in &self.agents {
            section.push_str(&format!("- Consider the expertise of {}\n", agent));
        }
        Some(section.trim_end().to_string())
    }
}
