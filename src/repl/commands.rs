//! Built-in chat commands

use colored::*;

/// Chat command types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    History { limit: Option<usize> },
    Stats,
    Prompt,
    Exit,
    Unknown { input: String },
}

/// Check if input is a command (starts with /)
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

/// Parse input string into a command
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let Some(body) = trimmed.strip_prefix('/') else {
        return Command::Unknown {
            input: input.to_string(),
        };
    };

    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some(name) = parts.first() else {
        return Command::Unknown {
            input: input.to_string(),
        };
    };

    match name.to_lowercase().as_str() {
        "help" | "h" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        "history" => Command::History {
            limit: parts.get(1).and_then(|s| s.parse().ok()),
        },
        "stats" => Command::Stats,
        "prompt" => Command::Prompt,
        _ => Command::Unknown {
            input: input.to_string(),
        },
    }
}

/// Print command help
pub fn show_help() {
    println!("{}", "Commands".bold().underline());
    println!("  {}          show this help", "/help".cyan());
    println!("  {} [n]   show the last n turns (default 10)", "/history".cyan());
    println!("  {}         show stream statistics", "/stats".cyan());
    println!("  {}        show the analysis prompt the chat started from", "/prompt".cyan());
    println!("  {}          leave the chat", "/exit".cyan());
    println!();
}
