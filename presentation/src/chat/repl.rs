//! REPL (Read-Eval-Print Loop) for interactive chat

use super::session::{ChatDriver, ChatSession};
use crate::output::format_tool_list;
use chatflow_application::ModelBackend;
use chatflow_domain::{ConversationRepository, ToolChoiceMode};
use futures::future::BoxFuture;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

const HISTORY_SIZE: usize = 1000;

/// Re-discovers external providers; yields a one-line summary
pub type RefreshHook = Arc<dyn Fn() -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

/// Slash commands understood by the REPL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Quit,
    New,
    Thread,
    Tools,
    Refresh,
    /// `None` toggles
    Manual(Option<bool>),
    Artifacts,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line starting with `/`
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next();
        match name {
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            "/new" => ReplCommand::New,
            "/thread" => ReplCommand::Thread,
            "/tools" => ReplCommand::Tools,
            "/refresh" => ReplCommand::Refresh,
            "/artifacts" => ReplCommand::Artifacts,
            "/manual" => match arg {
                None => ReplCommand::Manual(None),
                Some("on") => ReplCommand::Manual(Some(true)),
                Some("off") => ReplCommand::Manual(Some(false)),
                Some(_) => ReplCommand::Unknown(line.to_string()),
            },
            _ => ReplCommand::Unknown(line.to_string()),
        }
    }
}

/// Interactive chat REPL
pub struct ChatRepl<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> {
    driver: ChatDriver<B, R>,
    session: ChatSession,
    refresh: Option<RefreshHook>,
    history_path: Option<PathBuf>,
}

impl<B: ModelBackend + 'static, R: ConversationRepository + ?Sized + 'static> ChatRepl<B, R> {
    pub fn new(driver: ChatDriver<B, R>, session: ChatSession) -> Self {
        Self {
            driver,
            session,
            refresh: None,
            history_path: dirs::data_dir().map(|p| p.join("chatflow").join("history.txt")),
        }
    }

    /// Hook behind `/refresh`
    pub fn with_refresh(mut self, hook: RefreshHook) -> Self {
        self.refresh = Some(hook);
        self
    }

    /// Run the interactive REPL until `/quit` or Ctrl+D
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut line_editor = Reedline::create();
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_SIZE, path.clone()) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => warn!(path = %path.display(), "History disabled: {}", e),
            }
        }
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("chatflow".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        loop {
            match line_editor.read_line(&prompt)? {
                Signal::Success(buffer) => {
                    let line = buffer.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line.starts_with('/') {
                        if self.handle_command(ReplCommand::parse(line)).await {
                            break;
                        }
                        continue;
                    }
                    self.process_message(line).await;
                }
                Signal::CtrlC => {
                    println!("^C");
                }
                Signal::CtrlD => {
                    println!("Bye!");
                    break;
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }

        let artifacts = self.driver.finish().await;
        debug!(artifacts = artifacts.len(), "Chat session closed");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│               chatflow - chat               │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Tool mode: {}", self.session.tool_choice);
        println!();
        print_help();
    }

    /// Handle slash commands. Returns true if should exit.
    async fn handle_command(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                return true;
            }
            ReplCommand::Help => print_help(),
            ReplCommand::New => {
                self.session.reset_thread();
                println!("Started a new thread");
            }
            ReplCommand::Thread => match &self.session.thread_id {
                Some(id) => println!("Thread: {}", id),
                None => println!("No thread yet"),
            },
            ReplCommand::Tools => match self.driver.tools(&self.session).await {
                Ok(tools) => print!("{}", format_tool_list(&tools)),
                Err(e) => eprintln!("Error: {}", e),
            },
            ReplCommand::Refresh => match &self.refresh {
                Some(hook) => match hook().await {
                    Ok(summary) => println!("{}", summary),
                    Err(e) => eprintln!("Refresh failed: {}", e),
                },
                None => println!("No external providers configured"),
            },
            ReplCommand::Manual(setting) => {
                let manual = setting.unwrap_or(self.session.tool_choice != ToolChoiceMode::Manual);
                self.session.tool_choice = if manual {
                    ToolChoiceMode::Manual
                } else {
                    ToolChoiceMode::Auto
                };
                println!("Tool mode: {}", self.session.tool_choice);
            }
            ReplCommand::Artifacts => {
                let artifacts = self
                    .driver
                    .canvas()
                    .map(|c| c.snapshot())
                    .unwrap_or_default();
                if artifacts.is_empty() {
                    println!("No artifacts");
                }
                for artifact in artifacts {
                    println!(
                        "  {:<32} {:<10} {}",
                        artifact.id,
                        artifact.status,
                        artifact.title.as_deref().unwrap_or(&artifact.kind)
                    );
                }
            }
            ReplCommand::Unknown(line) => {
                println!("Unknown command: {}", line);
                println!("Type /help for available commands");
            }
        }
        false
    }

    async fn process_message(&mut self, message: &str) {
        println!();
        let mut stdout = std::io::stdout();
        match self
            .driver
            .send(&mut self.session, message.to_string(), &mut stdout)
            .await
        {
            Ok(output) => {
                if let Some(error) = output.error {
                    eprintln!("Error: {}", error);
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        }
        println!();
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /help, /h, /?      - Show this help");
    println!("  /new               - Start a new thread");
    println!("  /thread            - Show the current thread id");
    println!("  /tools             - List tools available to the next turn");
    println!("  /refresh           - Re-discover external provider tools");
    println!("  /manual [on|off]   - Confirm each tool call before it runs");
    println!("  /artifacts         - List canvas artifacts");
    println!("  /quit, /exit, /q   - Exit chat");
    println!();
}
