//! Error types for rill-client

use crate::decode::DecodeError;
use thiserror::Error;

/// Errors surfaced by a submission
#[derive(Error, Debug)]
pub enum ClientError {
    /// The message was empty after trimming; nothing was sent
    #[error("Message is empty")]
    EmptyMessage,

    /// The HTTP request could not be issued or completed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status before streaming
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body stream failed mid-read
    #[error("Stream error: {0}")]
    Stream(String),

    /// The response bytes were not valid UTF-8
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}
