//! Conversation state: ordered turns, streaming status, and the last error.
//!
//! Mutation goes through epoch-guarded methods. Every active stream holds the
//! epoch it was issued; once the conversation is cleared or a new stream
//! supersedes it, the old epoch stops matching and the orphaned stream's
//! writes become no-ops. This enforces the at-most-one-growing-turn invariant
//! instead of assuming it.

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Conversation state: turns, streaming flag, last error.
///
/// Only the most recent assistant turn may grow, and only while
/// `is_streaming` is true.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    is_streaming: bool,
    last_error: Option<String>,
    epoch: u64,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns, in order
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Whether a stream is currently growing the last assistant turn
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// The most recent error surfaced to the user, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Append an empty assistant placeholder and mark the stream active.
    ///
    /// Returns the epoch the caller must present with every subsequent
    /// mutation for this stream. Any previously active stream is frozen
    /// first.
    pub fn begin_assistant(&mut self) -> u64 {
        self.interrupt();
        self.epoch += 1;
        self.turns.push(ConversationTurn {
            role: Role::Assistant,
            content: String::new(),
        });
        self.is_streaming = true;
        self.epoch
    }

    /// Grow the placeholder turn by one increment.
    ///
    /// Returns false when the stream is orphaned (epoch mismatch or no
    /// active stream); the caller must stop applying increments.
    pub fn apply_increment(&mut self, epoch: u64, chunk: &str) -> bool {
        if !self.stream_matches(epoch) {
            return false;
        }
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::Assistant => {
                turn.content.push_str(chunk);
                true
            }
            _ => false,
        }
    }

    /// Finalize the active stream: the turn stops growing and any prior
    /// error indicator is cleared. Returns false for orphaned streams.
    pub fn finish_stream(&mut self, epoch: u64) -> bool {
        if !self.stream_matches(epoch) {
            return false;
        }
        self.is_streaming = false;
        self.last_error = None;
        true
    }

    /// Fail the active stream: a placeholder that never received content is
    /// discarded, partial content stays visible, and the error is recorded.
    /// Returns false for orphaned streams.
    pub fn fail_stream(&mut self, epoch: u64, error: impl Into<String>) -> bool {
        if !self.stream_matches(epoch) {
            return false;
        }
        self.drop_empty_placeholder();
        self.is_streaming = false;
        self.last_error = Some(error.into());
        true
    }

    /// Record an error that occurred before any placeholder existed
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Freeze a specific stream if it is still the active one. Used when a
    /// stream is aborted externally; a stream already superseded or cleared
    /// is left alone. Returns false for orphaned streams.
    pub fn interrupt_stream(&mut self, epoch: u64) -> bool {
        if !self.stream_matches(epoch) {
            return false;
        }
        self.drop_empty_placeholder();
        self.is_streaming = false;
        self.epoch += 1;
        true
    }

    /// Freeze the active stream, if any: the growing turn keeps its partial
    /// content (or is dropped while still empty) and its epoch is retired.
    pub fn interrupt(&mut self) {
        if !self.is_streaming {
            return;
        }
        self.drop_empty_placeholder();
        self.is_streaming = false;
        self.epoch += 1;
    }

    /// Remove every turn and reset error/streaming state. Increments from a
    /// stream that was active at clear time can never reappear.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.is_streaming = false;
        self.last_error = None;
        self.epoch += 1;
    }

    fn stream_matches(&self, epoch: u64) -> bool {
        self.is_streaming && self.epoch == epoch
    }

    fn drop_empty_placeholder(&mut self) {
        if matches!(
            self.turns.last(),
            Some(turn) if turn.role == Role::Assistant && turn.content.is_empty()
        ) {
            self.turns.pop();
        }
    }
}
