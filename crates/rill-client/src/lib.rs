//! rill-client: the Stream Client half of the rill pipeline
//!
//! Owns the conversation state and the streamed chat request: submit a
//! message, watch increments mutate the growing assistant turn, and render
//! live through the event subscription.

pub mod client;
pub mod conversation;
pub mod decode;
pub mod error;
pub mod events;
pub mod handle;

pub use client::{ChatClient, DEFAULT_DEVELOPER_MESSAGE, DEFAULT_ENDPOINT};
pub use conversation::{Conversation, ConversationTurn, Role};
pub use decode::{DecodeError, StreamDecoder};
pub use error::ClientError;
pub use events::ClientEvent;
pub use handle::StreamHandle;
