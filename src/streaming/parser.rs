//! Incremental event-stream parser for streaming responses
//!
//! The endpoint answers with newline-delimited server-sent events. Each
//! meaningful line looks like
//!
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Hel"}]}}]}
//! ```
//!
//! Network reads do not respect line boundaries, so bytes are buffered
//! until a `\n` arrives. Lines without the `data:` prefix, the `[DONE]`
//! sentinel, and payloads that do not match the event shape produce no
//! fragment; none of them abort the stream.

use crate::errors::{MatchError, Result};
use crate::types::AnalysisResult;
use serde::Deserialize;

/// Maximum bytes buffered for a single unterminated line (1MB)
pub const MAX_LINE_SIZE: usize = 1_048_576;

/// Prefix of every event line the parser examines
pub const DATA_PREFIX: &str = "data:";

/// Sentinel some gateways send as the final event
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental line parser
#[derive(Debug)]
pub struct SseLineParser {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,

    /// Maximum line size before the line is dropped
    max_line_size: usize,

    /// Dropping bytes until the next newline
    discarding: bool,
}

impl SseLineParser {
    /// Create parser with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_SIZE)
    }

    /// Create parser with a custom line limit
    pub fn with_capacity(max_line_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_line_size,
            discarding: false,
        }
    }

    /// Feed one network chunk, returning the fragments of every line it completed
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                self.buffer.clear();
                continue;
            }

            if self.buffer.len() + head.len() > self.max_line_size {
                self.drop_line(self.buffer.len() + head.len());
                continue;
            }

            self.buffer.extend_from_slice(head);
            if let Some(fragment) = self.take_line() {
                fragments.push(fragment);
            }
        }

        if !self.discarding {
            if self.buffer.len() + rest.len() > self.max_line_size {
                self.drop_line(self.buffer.len() + rest.len());
                self.discarding = true;
            } else {
                self.buffer.extend_from_slice(rest);
            }
        }

        fragments
    }

    /// Flush a trailing line that was never newline-terminated
    pub fn finish(&mut self) -> Option<String> {
        if self.discarding {
            self.discarding = false;
            self.buffer.clear();
            return None;
        }
        self.take_line()
    }

    fn drop_line(&mut self, size: usize) {
        tracing::warn!(size, max = self.max_line_size, "dropping oversized event line");
        self.buffer.clear();
    }

    fn take_line(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        parse_line(&line)
    }
}

impl Default for SseLineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the text delta carried by a single event line
///
/// Returns `None` for anything that is not a well-formed, non-empty delta.
pub fn parse_line(line: &str) -> Option<String> {
    let payload = line.trim_end_matches('\r').strip_prefix(DATA_PREFIX)?.trim();

    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => event.into_text().filter(|text| !text.is_empty()),
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable event line");
            None
        }
    }
}

/// Streaming event shape: `candidates[0].content.parts[0].text`
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<EventPart>,
}

#[derive(Debug, Deserialize)]
struct EventPart {
    text: Option<String>,
}

impl StreamEvent {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Cut the outermost `{...}` span out of model output
///
/// Fence markers are removed first; prose before the first `{` and after
/// the last `}` is discarded.
pub fn extract_json_object(text: &str) -> Result<&str> {
    let cleaned = text.trim();
    let start = cleaned
        .find('{')
        .ok_or_else(|| MatchError::MalformedPayload("no '{' found in response".to_string()))?;
    let end = cleaned
        .rfind('}')
        .ok_or_else(|| MatchError::MalformedPayload("no '}' found in response".to_string()))?;

    if end < start {
        return Err(MatchError::MalformedPayload(
            "closing brace precedes opening brace".to_string(),
        ));
    }

    Ok(&cleaned[start..=end])
}

/// Remove ```` ```json ```` and ```` ``` ```` markers anywhere in the text
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the fully accumulated analysis text into a record
pub fn parse_analysis(text: &str) -> Result<AnalysisResult> {
    if text.trim().is_empty() {
        return Err(MatchError::EmptyResponse);
    }

    let cleaned = strip_code_fences(text);
    let json = extract_json_object(&cleaned)?;

    serde_json::from_str(json)
        .map_err(|e| MatchError::MalformedPayload(format!("Failed to parse analysis: {}", e)))
}
