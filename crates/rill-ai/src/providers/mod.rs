//! Upstream provider implementations

pub mod openai;

use crate::{CompletionRequest, Error, IncrementStream, Result};
use async_trait::async_trait;

/// Trait for upstream completion providers.
///
/// The relay talks to the model provider exclusively through this seam, so
/// tests can substitute a scripted upstream.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Open a streamed completion call, yielding ordered text increments.
    ///
    /// Failures to establish the stream surface here as `Err`; failures after
    /// the first increment surface as an `Err` item inside the stream.
    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementStream>;
}

/// Get an API key from environment or provided value
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::MissingApiKey)
}
