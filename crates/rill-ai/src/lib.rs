//! rill-ai: Upstream LLM streaming layer
//!
//! This crate provides the types shared across the rill pipeline and the
//! streaming client for OpenAI-compatible completion endpoints. Upstream
//! responses are surfaced as ordered text increments.

pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use providers::Upstream;
pub use stream::IncrementStream;
pub use types::*;
