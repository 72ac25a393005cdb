//! Streaming client module
//!
//! Provides the generation API client, the event-stream parser, and the
//! lazy fragment sequence built on top of both.

pub mod backend;
pub mod client;
pub mod fragments;
pub mod parser;

// Re-export commonly used types
pub use backend::CompletionBackend;
pub use client::{ClientConfig, GeminiClient, ModelInfo, DEFAULT_ENDPOINT_TEMPLATE, DEFAULT_MODEL};
pub use fragments::{ByteStream, FragmentStream};
pub use parser::{extract_json_object, parse_analysis, SseLineParser, MAX_LINE_SIZE};
