//! Client event types

use serde::{Deserialize, Serialize};

/// Events emitted while a submission runs, for live rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The user turn was appended
    UserTurn { content: String },

    /// The assistant placeholder was created; increments follow
    StreamStart,

    /// One text increment was applied to the growing turn
    Increment { delta: String },

    /// The stream finished cleanly; `content` is the full assistant text
    StreamEnd { content: String },

    /// The submission failed; partial content may remain visible
    StreamError { message: String },

    /// The conversation was cleared
    Cleared,
}

impl ClientEvent {
    /// Check if this event ends a submission
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientEvent::StreamEnd { .. } | ClientEvent::StreamError { .. }
        )
    }
}
