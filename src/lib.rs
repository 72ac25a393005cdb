//! jobmatch - resume/job fit analysis and chat over a streaming generation API
//!
//! # Architecture
//!
//! - **streaming**: event-stream client producing lazy text fragments
//! - **session**: multi-turn conversation history over the client
//! - **analysis**: one-shot analysis prompt and persisted chat context
//! - **cli / repl**: terminal entry point and chat loop

pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{MatchError, Result};

// Core
pub mod streaming;
pub mod session;
pub mod analysis;

// Ambient stack
pub mod telemetry;
pub mod cli;

// Terminal chat
pub mod repl;
