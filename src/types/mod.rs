//! Type definitions module
//!
//! Conversation turns, their wire projection, and the analysis record.

pub mod messages;
pub use messages::{Part, Role, Turn, WireContent};

// Structured analysis record
pub mod result;
pub use result::AnalysisResult;
