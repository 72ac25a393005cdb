//! Command-line argument parsing for jobmatch
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// jobmatch - score a resume against a job description, then chat about it
#[derive(Parser, Debug)]
#[command(name = "jobmatch")]
#[command(version)]
#[command(about = "Score a resume against a job description and chat about the fit", long_about = None)]
pub struct Args {
    /// Model id (overrides the config file)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// API key (overrides the config file)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the fit between a resume and a job description
    Analyze {
        /// Resume text file (defaults to [profile] resume_path)
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Job description text file, or `-` for stdin
        #[arg(long)]
        job: PathBuf,

        /// Print the raw analysis record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chat about the last analysis (or analyze first when --job is given)
    Chat {
        /// Resume text file (defaults to [profile] resume_path)
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Job description text file, or `-` for stdin
        #[arg(long)]
        job: Option<PathBuf>,
    },

    /// List models available for generation
    Models,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "jobmatch=info,warn",
            Verbosity::VeryVerbose => "jobmatch=debug,info",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show stream statistics after each reply
    pub fn show_stats(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
