//! CLI entrypoint for chatflow
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, anyhow, bail};
use chatflow_application::{
    AssembleToolsUseCase, ChatProgressNotifier, NoChatProgress, RunChatUseCase, TraceSink,
};
use chatflow_domain::{AgentInstructions, ConversationRepository, OutputFormat, Toolkit};
use chatflow_infrastructure::{
    ConfigLoader, DefaultToolkitSource, ExternalProviderSource, FileConfig, FileWorkflowStore,
    InMemoryConversationRepository, JsonlConversationRepository, JsonlTraceSink, OpenAiBackend,
    ProviderPool, ProviderSpec, WorkflowEngine, WorkflowToolSource,
};
use chatflow_presentation::{
    CanvasMaterializer, CanvasTimings, ChatDriver, ChatRepl, ChatSession, Cli, ConsoleCanvasView,
    InteractiveConfirmation, ProgressReporter, ProviderGrant, RefreshHook, SimpleProgress,
    format_tool_list,
};
use clap::Parser;
use futures::FutureExt;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref());

    info!("Starting chatflow");

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("{}", e))?
    };
    for issue in config.ensure_valid()? {
        warn!(code = ?issue.code, "{}", issue.message);
    }
    if !config.output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let specs: Vec<ProviderSpec> = config
        .providers
        .enabled_servers()
        .map(ProviderSpec::from)
        .collect();
    let pool = ProviderPool::init_global(specs);
    let assembler = build_assembler(&config, Arc::clone(&pool));

    let repository: Arc<dyn ConversationRepository> =
        match (cli.ephemeral, config.storage.resolve_dir()) {
            (false, Some(dir)) => {
                info!(dir = %dir.display(), "Storing conversations as JSONL");
                Arc::new(JsonlConversationRepository::new(dir))
            }
            _ => Arc::new(InMemoryConversationRepository::new()),
        };

    let backend = Arc::new(OpenAiBackend::from_config(&config.backend));
    let mut use_case = RunChatUseCase::new(backend, Arc::clone(&repository), Arc::new(assembler))
        .with_params(config.chat.to_chat_params());
    if let Some(path) = config.logging.resolve_trace_file()
        && let Some(sink) = JsonlTraceSink::new(&path)
    {
        info!(path = %path.display(), "Writing turn traces");
        use_case = use_case.with_trace_sink(Arc::new(sink) as Arc<dyn TraceSink>);
    }

    // === Session ===
    let mut session = ChatSession::new(identity(&cli));
    session.thread_id = cli.thread.clone();
    session.model = cli.model.clone();
    session.tool_choice = cli
        .tool_choice()
        .unwrap_or_else(|| config.chat.parse_tool_choice().0);
    session.toolkits = cli
        .toolkit_names()
        .or_else(|| config.chat.default_toolkits.clone());
    session.mentions = cli.mentions.clone();
    session.agent = cli.agent.clone().map(|agent_id| AgentInstructions {
        agent_id,
        name: None,
        instructions: cli.instructions.clone().unwrap_or_default(),
    });

    let wildcard = cli.allowed_providers.iter().any(|g| g.tool_name.is_none());
    let snapshot = if wildcard {
        Some(pool.snapshot().await)
    } else {
        None
    };
    session.allowed_providers = ProviderGrant::to_allowed_set(&cli.allowed_providers, |id| {
        snapshot
            .as_ref()
            .and_then(|s| s.provider(id))
            .map(|p| p.tools.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    });

    // === Presentation ===
    let format = config.output.resolve_format(cli.output.map(OutputFormat::from));
    let progress: Arc<dyn ChatProgressNotifier> =
        if cli.quiet || !config.output.wants_progress(format) {
            Arc::new(NoChatProgress)
        } else if std::io::stderr().is_terminal() {
            Arc::new(ProgressReporter::new())
        } else {
            Arc::new(SimpleProgress)
        };
    let canvas = CanvasMaterializer::spawn(
        Arc::new(ConsoleCanvasView::new()),
        CanvasTimings {
            soft_timeout: config.canvas.soft_timeout(),
            hard_timeout: config.canvas.hard_timeout(),
            debounce: config.canvas.debounce(),
        },
    );

    let driver = ChatDriver::new(use_case, repository)
        .with_confirmation_port(Arc::new(InteractiveConfirmation::new()))
        .with_progress(progress)
        .with_canvas(canvas)
        .with_output_format(format);

    if cli.list_tools {
        let tools = driver.tools(&session).await?;
        print!("{}", format_tool_list(&tools));
        return Ok(());
    }

    // Chat mode
    if cli.chat {
        let mut repl = ChatRepl::new(driver, session);
        if !pool.is_empty() {
            repl = repl.with_refresh(refresh_hook(pool));
        }
        repl.run().await?;
        return Ok(());
    }

    // Single message mode - message is required
    let Some(message) = cli.message.clone() else {
        bail!("Message is required. Use --chat for interactive mode.");
    };

    let mut stdout = std::io::stdout();
    let output = driver.send(&mut session, message, &mut stdout).await?;
    let artifacts = driver.finish().await;
    info!(
        thread_id = %output.thread_id,
        finish_reason = output.finish_reason.as_str(),
        artifacts = artifacts.len(),
        "Turn finished"
    );

    if format == OutputFormat::Console && !cli.quiet {
        eprintln!("\nthread: {}", output.thread_id);
    }
    if let Some(error) = output.error {
        bail!("{}", error);
    }
    Ok(())
}

/// Initialize logging based on verbosity level. `RUST_LOG` wins when set.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "chatflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// Register the three tool sources
fn build_assembler(config: &FileConfig, pool: Arc<ProviderPool>) -> AssembleToolsUseCase {
    let toolkits = DefaultToolkitSource::new();
    let mut assembler = AssembleToolsUseCase::new();

    if config.workflows.enabled
        && let Some(dir) = config.workflows.resolve_dir()
    {
        let store = Arc::new(FileWorkflowStore::new(dir));
        // Workflow nodes may call any in-process toolkit tool
        let engine = WorkflowEngine::new(Arc::clone(&store))
            .with_tools(Toolkit::ALL.into_iter().flat_map(|t| toolkits.toolkit_tools(t)));
        let source = WorkflowToolSource::new(store, Arc::new(engine));
        assembler = assembler.with_source(Arc::new(source));
    }

    assembler
        .with_source(Arc::new(toolkits))
        .with_source(Arc::new(ExternalProviderSource::new(pool)))
}

fn identity(cli: &Cli) -> String {
    cli.user
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "local".to_string())
}

fn refresh_hook(pool: Arc<ProviderPool>) -> RefreshHook {
    Arc::new(move || {
        let pool = Arc::clone(&pool);
        async move {
            let snapshot = pool.refresh().await;
            for failure in &snapshot.failures {
                warn!(provider = %failure.provider_id, "Provider unavailable: {}", failure.message);
            }
            if snapshot.providers.is_empty() && !snapshot.failures.is_empty() {
                return Err(format!("{} provider(s) unavailable", snapshot.failures.len()));
            }
            Ok(format!(
                "{} provider(s), {} tool(s)",
                snapshot.providers.len(),
                snapshot.tool_count()
            ))
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_flag() {
        let cli = Cli::parse_from(["chatflow", "--user", "alice", "hi"]);
        assert_eq!(identity(&cli), "alice");
    }

    #[test]
    fn test_assembler_sources_follow_workflow_setting() {
        let pool = Arc::new(ProviderPool::new(Vec::new()));
        let mut config = FileConfig::default();
        config.workflows.dir = Some("workflows".into());
        assert_eq!(build_assembler(&config, Arc::clone(&pool)).source_count(), 3);

        config.workflows.enabled = false;
        assert_eq!(build_assembler(&config, pool).source_count(), 2);
    }
}
