//! Streaming increment types

use crate::error::Result;
use std::pin::Pin;
use tokio_stream::Stream;

/// An ordered stream of text increments from the upstream provider.
///
/// Concatenating every `Ok` item in arrival order yields the full response
/// text. An `Err` item means the stream failed mid-flight; no further items
/// follow it.
pub type IncrementStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
