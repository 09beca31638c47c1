//! CLI command definitions

use chatflow_domain::{AllowedProviderSet, Mention, ToolChoiceMode};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for streamed frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable console output
    Console,
    /// One JSON frame per line (NDJSON)
    Json,
}

impl From<OutputFormat> for chatflow_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Console => chatflow_domain::OutputFormat::Console,
            OutputFormat::Json => chatflow_domain::OutputFormat::Json,
        }
    }
}

impl From<chatflow_domain::OutputFormat> for OutputFormat {
    fn from(format: chatflow_domain::OutputFormat) -> Self {
        match format {
            chatflow_domain::OutputFormat::Console => OutputFormat::Console,
            chatflow_domain::OutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for chatflow
#[derive(Parser, Debug)]
#[command(name = "chatflow")]
#[command(author, version, about = "Tool-augmented streaming chat")]
#[command(long_about = r#"
chatflow sends a message to a model that may call tools from three sources:
remote tool providers, stored workflows and the built-in toolkits
(visualization, http, clock). Tool results that describe charts or tables
are tracked as canvas artifacts.

Configuration files are loaded from (in priority order):
1. CHATFLOW_* environment variables (CHATFLOW_CHAT__MAX_STEPS=4)
2. --config <path>          Explicit config file
3. ./chatflow.toml          Project-level config
4. ~/.config/chatflow/config.toml   Global config

Example:
  chatflow "Plot last week's temperatures as a line chart"
  chatflow --allow-provider github:search_issues "Find open bugs about login"
  chatflow --chat --manual
"#)]
pub struct Cli {
    /// The message to send (not required in chat mode)
    pub message: Option<String>,

    /// Start interactive chat mode
    #[arg(short, long)]
    pub chat: bool,

    /// Continue an existing thread
    #[arg(short, long, value_name = "ID")]
    pub thread: Option<String>,

    /// Model to use (overrides backend.model)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Ask before running each tool call
    #[arg(long, conflicts_with = "no_tools")]
    pub manual: bool,

    /// Do not offer any tools to the model
    #[arg(long)]
    pub no_tools: bool,

    /// Default toolkits to enable (repeatable; default: all)
    #[arg(long = "toolkit", value_name = "NAME")]
    pub toolkits: Vec<String>,

    /// Permit a provider tool as PROVIDER:TOOL, or PROVIDER:* for all of its tools
    #[arg(
        long = "allow-provider",
        value_name = "PROVIDER:TOOL",
        value_parser = parse_provider_grant
    )]
    pub allowed_providers: Vec<ProviderGrant>,

    /// Point the model at a tool, provider, workflow or agent
    /// (tool:NAME, provider:ID[:TOOL], workflow:ID, agent:ID)
    #[arg(long = "mention", value_name = "KIND:REF", value_parser = parse_mention)]
    pub mentions: Vec<Mention>,

    /// Agent id recorded with the response
    #[arg(long, value_name = "ID", requires = "instructions")]
    pub agent: Option<String>,

    /// Extra system instructions for the agent
    #[arg(long, value_name = "TEXT")]
    pub instructions: Option<String>,

    /// Identity that owns the conversation (default: $USER)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Keep the conversation in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Output format (default: from config, else console)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Write operation logs to daily files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Assemble the tool registry, print it and exit
    #[arg(long)]
    pub list_tools: bool,
}

impl Cli {
    /// Tool choice requested on the command line
    pub fn tool_choice(&self) -> Option<ToolChoiceMode> {
        if self.no_tools {
            Some(ToolChoiceMode::None)
        } else if self.manual {
            Some(ToolChoiceMode::Manual)
        } else {
            None
        }
    }

    /// Toolkit names, or `None` to leave the selection to configuration
    pub fn toolkit_names(&self) -> Option<Vec<String>> {
        (!self.toolkits.is_empty()).then(|| self.toolkits.clone())
    }
}

/// One `--allow-provider` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderGrant {
    pub provider_id: String,
    /// `None` grants every tool the provider currently offers
    pub tool_name: Option<String>,
}

impl ProviderGrant {
    /// Build the permission set. Wildcard grants are expanded with
    /// `tools_of`, which lists the tools a provider offers.
    pub fn to_allowed_set<F>(grants: &[ProviderGrant], tools_of: F) -> Option<AllowedProviderSet>
    where
        F: Fn(&str) -> Vec<String>,
    {
        if grants.is_empty() {
            return None;
        }
        let set = grants.iter().fold(AllowedProviderSet::new(), |set, grant| {
            match &grant.tool_name {
                Some(tool) => set.allow(&grant.provider_id, tool),
                None => set.allow_all(&grant.provider_id, tools_of(&grant.provider_id)),
            }
        });
        Some(set)
    }
}

fn parse_provider_grant(value: &str) -> Result<ProviderGrant, String> {
    let (provider, tool) = value
        .split_once(':')
        .ok_or_else(|| format!("expected PROVIDER:TOOL, got '{}'", value))?;
    if provider.is_empty() || tool.is_empty() {
        return Err(format!("expected PROVIDER:TOOL, got '{}'", value));
    }
    Ok(ProviderGrant {
        provider_id: provider.to_string(),
        tool_name: (tool != "*").then(|| tool.to_string()),
    })
}

fn parse_mention(value: &str) -> Result<Mention, String> {
    let (kind, reference) = value
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:REF, got '{}'", value))?;
    if reference.is_empty() {
        return Err(format!("mention '{}' has no reference", value));
    }
    match kind {
        "tool" => Ok(Mention::DefaultTool {
            name: reference.to_string(),
        }),
        "provider" => {
            let (provider_id, tool_name) = match reference.split_once(':') {
                Some((id, tool)) => (id.to_string(), Some(tool.to_string())),
                None => (reference.to_string(), None),
            };
            Ok(Mention::Provider {
                provider_id,
                tool_name,
            })
        }
        "workflow" => Ok(Mention::Workflow {
            workflow_id: reference.to_string(),
            name: None,
        }),
        "agent" => Ok(Mention::Agent {
            agent_id: reference.to_string(),
            name: None,
        }),
        other => Err(format!(
            "unknown mention kind '{}' (expected tool, provider, workflow or agent)",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "chatflow",
            "--manual",
            "--toolkit",
            "clock",
            "--allow-provider",
            "github:search_issues",
            "--allow-provider",
            "jira:*",
            "--mention",
            "provider:github:search_issues",
            "-o",
            "json",
            "hello",
        ])
        .unwrap();

        assert_eq!(cli.message.as_deref(), Some("hello"));
        assert_eq!(cli.tool_choice(), Some(ToolChoiceMode::Manual));
        assert_eq!(cli.toolkit_names(), Some(vec!["clock".to_string()]));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.allowed_providers[1].tool_name, None);
        assert_eq!(
            cli.mentions[0],
            Mention::Provider {
                provider_id: "github".into(),
                tool_name: Some("search_issues".into())
            }
        );
    }

    #[test]
    fn test_manual_conflicts_with_no_tools() {
        assert!(Cli::try_parse_from(["chatflow", "--manual", "--no-tools", "x"]).is_err());
    }

    #[test]
    fn test_bad_mention_rejected() {
        assert!(Cli::try_parse_from(["chatflow", "--mention", "colour:red", "x"]).is_err());
        assert!(Cli::try_parse_from(["chatflow", "--allow-provider", "github", "x"]).is_err());
    }

    #[test]
    fn test_wildcard_grant_expands() {
        let grants = vec![
            parse_provider_grant("github:*").unwrap(),
            parse_provider_grant("jira:create_issue").unwrap(),
        ];
        let set = ProviderGrant::to_allowed_set(&grants, |id| {
            if id == "github" {
                vec!["search_issues".to_string(), "get_issue".to_string()]
            } else {
                Vec::new()
            }
        })
        .unwrap();

        assert!(set.permits("github", "get_issue"));
        assert!(set.permits("jira", "create_issue"));
        assert!(!set.permits("jira", "delete_issue"));
        assert!(ProviderGrant::to_allowed_set(&[], |_| Vec::new()).is_none());
    }
}
