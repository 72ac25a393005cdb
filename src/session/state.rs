//! Conversation session state machine
//!
//! Valid transitions:
//! 1. Uninitialized → Ready      (on: Bootstrap)
//! 2. Ready         → Streaming  (on: Send)
//! 3. Streaming     → Ready      (on: ReplyResolved)
//!
//! `Send` while Streaming is rejected with `SessionBusy`; every other
//! pair is an invalid transition.

use crate::errors::{MatchError, Result};
use serde::{Deserialize, Serialize};

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No history yet
    Uninitialized,

    /// Bootstrapped, no exchange in flight
    Ready,

    /// A reply is streaming; History is frozen until it resolves
    Streaming,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Seed the history with the analysis exchange
    Bootstrap,

    /// New user message
    Send,

    /// Reply finished, failed, or was cancelled
    ReplyResolved,
}

impl SessionState {
    /// Attempt state transition with validation
    pub fn transition(&self, event: SessionEvent) -> Result<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Uninitialized, Bootstrap) => Ok(Ready),
            (Ready, Send) => Ok(Streaming),
            (Streaming, ReplyResolved) => Ok(Ready),
            (Streaming, Send) => Err(MatchError::SessionBusy),
            (from, event) => Err(MatchError::InvalidTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }
}
