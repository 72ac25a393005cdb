//! Display manager for the terminal front-end
//!
//! Renders the analysis record, streamed chat fragments, and status lines.

use crate::types::{AnalysisResult, Role, Turn};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Display manager for terminal output
pub struct DisplayManager {
    spinner: Option<ProgressBar>,
    update_interval: Duration,
}

impl DisplayManager {
    pub fn new() -> Self {
        DisplayManager {
            spinner: None,
            update_interval: Duration::from_millis(100),
        }
    }

    /// Show chat banner
    pub fn show_banner(&self, version: &str, model: &str) {
        let width = 64;
        let rule = "=".repeat(width).cyan();
        println!("\n{}", rule);
        println!("{}", format!("  jobmatch {} - Resume Chat", version).bold().cyan());
        println!("{}", format!("  Model: {}", model).dimmed());
        println!("{}\n", rule);
        println!(
            "Ask anything about the analysis (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while a one-shot analysis streams in
    pub fn start_analysis(&mut self, model: &str) -> ProgressBar {
        self.finish_spinner();

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Analyzing fit with {}...", model));
        pb.enable_steady_tick(self.update_interval);

        self.spinner = Some(pb.clone());
        pb
    }

    /// Clear the current spinner
    pub fn finish_spinner(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }

    /// Render an analysis record
    pub fn show_analysis(&self, result: &AnalysisResult) {
        let score = format!("{}/100", result.match_score);
        let score = match result.match_score {
            75..=100 => score.green().bold(),
            50..=74 => score.yellow().bold(),
            _ => score.red().bold(),
        };

        println!("\n{} {}", "Match score:".bold(), score);
        println!("{}\n", result.summary);

        self.show_list("Matching skills", &result.key_matching_skills);
        self.show_list("Missing critical skills", &result.missing_critical_skills);
        self.show_list("Improvement tips", &result.improvement_tips);
    }

    fn show_list(&self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        self.show_section(title);
        for item in items {
            self.show_bullet(item);
        }
        println!();
    }

    /// Assistant label before a streamed reply
    pub fn start_reply(&self) {
        print!("{} ", "ai>".cyan().bold());
        let _ = io::stdout().flush();
    }

    /// Print one fragment as it arrives
    pub fn stream_fragment(&self, fragment: &str) {
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }

    /// End a completed reply
    pub fn finish_reply(&self) {
        println!("\n");
    }

    /// Tag a reply that stopped early
    pub fn show_incomplete(&self, reason: &str, received_chars: usize) {
        let tag = if received_chars == 0 {
            format!("[incomplete: {}]", reason)
        } else {
            format!("[incomplete after {} chars: {}]", received_chars, reason)
        };
        println!("\n{}\n", tag.yellow());
    }

    /// Show assistant message outside a stream
    pub fn show_assistant(&self, message: &str) {
        println!("{} {}\n", "ai>".cyan().bold(), message);
    }

    /// Print a stored turn
    pub fn show_turn(&self, index: usize, turn: &Turn, max_chars: usize) {
        let label = match turn.role {
            Role::User => "user ".green(),
            Role::Model => "model".cyan(),
        };
        let mut content: String = turn.content.chars().take(max_chars).collect();
        if turn.content.chars().count() > max_chars {
            content.push_str("...");
        }
        println!("{:>3}. {} {}", index, label, content.replace('\n', " ").dimmed());
    }

    /// Show error message
    pub fn show_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Show warning message
    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }

    /// Show info message
    pub fn show_info(&self, info: &str) {
        println!("{} {}", "Info:".cyan(), info);
    }

    /// Show section header
    pub fn show_section(&self, title: &str) {
        println!("{}", title.bold().underline());
    }

    /// Show bullet point
    pub fn show_bullet(&self, text: &str) {
        println!("  {} {}", "•".cyan(), text);
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}
