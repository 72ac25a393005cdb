//! Interactive chat front-end
//!
//! Reads messages, streams replies to the terminal as they arrive, and
//! handles built-in slash commands. Ctrl-C while a reply is opening or
//! streaming cancels that reply and keeps the chat open.

pub mod commands;
pub mod display;
pub mod input;

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;

use crate::analysis::WELCOME_MESSAGE;
use crate::cli::Verbosity;
use crate::errors::MatchError;
use crate::repl::commands::{is_command, Command};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::{PromptReader, UserInput};
use crate::session::{ConversationSession, PendingReply};
use crate::streaming::CompletionBackend;
use crate::telemetry::{TelemetryCollector, TelemetryDisplay};

/// How a streamed reply ended
#[derive(Debug)]
enum ReplyEnd {
    Completed,
    Failed(MatchError),
    Cancelled,
}

/// Chat loop coordinator
pub struct ChatRepl {
    input: PromptReader,
    display: DisplayManager,
    telemetry: TelemetryCollector,
    verbosity: Verbosity,
}

impl ChatRepl {
    /// Create chat loop with persistent input history
    pub fn new(history_path: PathBuf, telemetry: TelemetryCollector, verbosity: Verbosity) -> Result<Self> {
        Ok(ChatRepl {
            input: PromptReader::open(history_path)?,
            display: DisplayManager::new(),
            telemetry,
            verbosity,
        })
    }

    /// Run until /exit or EOF
    pub async fn run<B: CompletionBackend>(&mut self, session: &mut ConversationSession<B>) -> Result<()> {
        self.display.show_banner(env!("CARGO_PKG_VERSION"), session.backend().model());
        self.display.show_assistant(WELCOME_MESSAGE);

        loop {
            let line = match self.input.read()? {
                UserInput::Line(line) => line,
                UserInput::Blank => continue,
                UserInput::Interrupted => {
                    println!("Use /exit to quit");
                    continue;
                }
                UserInput::Eof => break,
            };

            if is_command(&line) {
                if !self.handle_command(commands::parse(&line), session) {
                    break;
                }
                continue;
            }

            self.exchange(session, &line).await;
        }

        self.input.save_history()?;
        if self.verbosity.show_stats() {
            TelemetryDisplay::new(self.telemetry.clone()).display_summary();
        }
        Ok(())
    }

    /// Returns false when the chat should end
    fn handle_command<B: CompletionBackend>(&self, command: Command, session: &ConversationSession<B>) -> bool {
        match command {
            Command::Help => commands::show_help(),
            Command::Exit => return false,
            Command::History { limit } => {
                let history = session.history();
                let limit = limit.unwrap_or(10);
                let start = history.len().saturating_sub(limit);
                for (i, turn) in history.iter().enumerate().skip(start) {
                    self.display.show_turn(i + 1, turn, 120);
                }
                println!();
            }
            Command::Stats => TelemetryDisplay::new(self.telemetry.clone()).display_summary(),
            Command::Prompt => match session.bootstrap_prompt() {
                Some(prompt) => println!("{}\n", prompt),
                None => self.display.show_warning("session has no analysis prompt"),
            },
            Command::Unknown { input } => {
                self.display.show_warning(&format!("Unknown command: {} (try /help)", input));
            }
        }
        true
    }

    /// Send one message and stream the reply to the terminal
    ///
    /// Ctrl-C cancels both while the stream is opening and while fragments
    /// arrive.
    async fn exchange<B: CompletionBackend>(&mut self, session: &mut ConversationSession<B>, text: &str) {
        let cancel = interrupt_signal();
        tokio::pin!(cancel);

        let mut reply = match until_cancelled(session.send(text), &mut cancel).await {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => {
                self.display.show_error(&e.to_string());
                return;
            }
            None => {
                self.display.show_incomplete("cancelled before the reply started", 0);
                return;
            }
        };

        self.display.start_reply();

        let end = loop {
            match until_cancelled(reply.next_fragment(), &mut cancel).await {
                Some(Some(Ok(fragment))) => self.display.stream_fragment(&fragment),
                Some(Some(Err(e))) => break ReplyEnd::Failed(e),
                Some(None) => break ReplyEnd::Completed,
                None => break ReplyEnd::Cancelled,
            }
        };

        let received = reply.partial().chars().count();
        match end {
            ReplyEnd::Completed => match session.finish(reply).await {
                Ok(_) => self.display.finish_reply(),
                Err(e) => self.display.show_incomplete(&incomplete_reason(&e), received),
            },
            ReplyEnd::Failed(e) => {
                abandon(session, reply);
                self.display.show_incomplete(&incomplete_reason(&e), received);
            }
            ReplyEnd::Cancelled => {
                abandon(session, reply);
                self.display.show_incomplete("cancelled", received);
            }
        }

        if self.verbosity.show_stats() {
            let stats = self.telemetry.get_stats();
            tracing::info!(
                fragments = stats.fragments_received,
                chars = stats.chars_received,
                first_fragment_ms = ?stats.last_first_fragment_ms,
                "reply stats"
            );
        }
    }
}

fn abandon<B: CompletionBackend>(session: &mut ConversationSession<B>, reply: PendingReply) {
    if let Err(e) = session.cancel(reply) {
        tracing::debug!(error = %e, "reply already resolved");
    }
}

fn incomplete_reason(error: &MatchError) -> String {
    match error {
        MatchError::StreamInterrupted { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run `work` unless `cancel` resolves first
async fn until_cancelled<T>(work: impl Future<Output = T>, cancel: impl Future<Output = ()>) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        _ = cancel => None,
    }
}
