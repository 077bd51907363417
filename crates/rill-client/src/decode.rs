//! Stateful UTF-8 decoding for transport-chunked text streams.
//!
//! Transport chunk boundaries carry no relationship to character boundaries,
//! so a multi-byte sequence can arrive split across reads. The decoder keeps
//! the undecodable tail of each chunk and prepends it to the next one.

use thiserror::Error;

/// Decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream contains bytes that are not valid UTF-8
    #[error("invalid UTF-8 sequence in stream")]
    InvalidUtf8,

    /// The stream ended in the middle of a multi-byte sequence
    #[error("stream ended inside a multi-byte UTF-8 sequence")]
    Incomplete,
}

/// Incremental UTF-8 decoder carrying partial sequences across chunks
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    /// Create a fresh decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all complete characters.
    ///
    /// An incomplete trailing sequence is held back for the next call. Bytes
    /// that can never form a valid sequence are a hard error.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<String, DecodeError> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        match std::str::from_utf8(&buf) {
            Ok(text) => Ok(text.to_string()),
            Err(e) => {
                // error_len is Some for malformed bytes; None means the buffer
                // merely ends mid-sequence.
                if e.error_len().is_some() {
                    return Err(DecodeError::InvalidUtf8);
                }
                let valid_up_to = e.valid_up_to();
                self.pending = buf.split_off(valid_up_to);
                Ok(String::from_utf8_lossy(&buf).into_owned())
            }
        }
    }

    /// Signal end-of-stream. Errors if a partial sequence is still pending.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            self.pending.clear();
            Err(DecodeError::Incomplete)
        }
    }
}
