//! Error types for jobmatch
//!
//! Every failure the client and session can surface to a caller lives in
//! [`MatchError`]. Per-line parse failures inside an event stream are the
//! only errors that never reach this type; the framing parser drops them.

use thiserror::Error;

/// Main error type for the jobmatch client and session
#[derive(Error, Debug)]
pub enum MatchError {
    /// The endpoint rejected the API key
    #[error("Invalid API credentials: {0}")]
    InvalidCredentials(String),

    /// Any other non-success HTTP status, with the server-reported message
    #[error("Upstream error (HTTP {status}): {message}")]
    UpstreamError { status: u16, message: String },

    /// The stream ended without a single text fragment
    #[error("No content generated")]
    EmptyResponse,

    /// The accumulated text could not be read as an analysis record
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Transport failed after fragments had started arriving
    #[error("Stream interrupted after {} chars: {reason}", partial.chars().count())]
    StreamInterrupted { partial: String, reason: String },

    /// A previous exchange on this session is still unresolved
    #[error("Session busy: a reply is still streaming")]
    SessionBusy,

    /// Session state machine rejected an operation
    #[error("Invalid session transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    /// Required input was empty
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// HTTP client errors (request never produced a response)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for jobmatch operations
pub type Result<T> = std::result::Result<T, MatchError>;

impl From<anyhow::Error> for MatchError {
    fn from(err: anyhow::Error) -> Self {
        MatchError::Generic(err.to_string())
    }
}
