//! A cloneable handle for the active stream.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A cloneable handle for aborting the active stream from external code.
///
/// The token is replaced on every submission, so aborting only ever affects
/// the stream that is currently live.
#[derive(Clone, Default)]
pub struct StreamHandle {
    cancel: Arc<Mutex<CancellationToken>>,
}

impl StreamHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort the active stream, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Cancel whatever was running and install a fresh token for the next
    /// stream. Returns the token the new stream must watch.
    pub(crate) fn begin(&self) -> CancellationToken {
        let mut guard = self.cancel.lock();
        guard.cancel();
        *guard = CancellationToken::new();
        guard.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_supersedes_previous_token() {
        let handle = StreamHandle::new();
        let first = handle.begin();
        let second = handle.begin();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        handle.abort();
        assert!(second.is_cancelled());
    }
}
