//! Conversation session module
//!
//! Owns the ordered turn history and mediates each chat message through a
//! completion backend, one exchange at a time.

pub mod conversation;
pub mod state;

// Re-export key types
pub use conversation::{ConversationSession, PendingReply};
pub use state::{SessionEvent, SessionState};

/// Session configuration: key, model, endpoint template
pub use crate::streaming::ClientConfig as SessionConfig;
