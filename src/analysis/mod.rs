//! Resume/job analysis module
//!
//! Builds the one-shot analysis prompt, runs it through a backend, and
//! keeps the resulting context so a chat can pick up where it left off.

pub mod context;
pub mod prompt;

pub use context::{ChatContext, CONTEXT_FILE_NAME};
pub use prompt::{analyze, build_analysis_prompt, truncate_chars, MAX_SOURCE_CHARS, WELCOME_MESSAGE};
