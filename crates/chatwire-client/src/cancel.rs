//! Cancellation signal shared between a stream run and its requesters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// One-shot cancellation for a single stream run.
///
/// Clones share state. Requesting cancellation is idempotent, safe from any
/// task, and a no-op once the run has settled. The stream loop both polls
/// [`is_cancelled`](Self::is_cancelled) between steps and awaits
/// [`cancelled`](Self::cancelled) to interrupt a pending read.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    settled: AtomicBool,
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a fresh, unsignalled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop.
    ///
    /// Returns `false` if the run had already settled.
    pub fn request_cancel(&self) -> bool {
        if self.inner.settled.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.token.cancel();
        true
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }

    /// Record that the run reached a terminal state.
    pub(crate) fn mark_settled(&self) {
        self.inner.settled.store(true, Ordering::SeqCst);
    }

    /// Whether the run reached a terminal state.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.inner.settled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn request_is_visible_to_clones() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());

        assert!(handle.request_cancel());
        assert!(clone.is_cancelled());
        // Idempotent.
        assert!(handle.request_cancel());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn request_after_settle_is_noop() {
        let handle = CancelHandle::new();
        handle.mark_settled();

        assert!(!handle.request_cancel());
        assert!(!handle.is_cancelled());
        assert!(handle.is_settled());
    }

    #[tokio::test]
    async fn cancelled_wakes_waiter() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.request_cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
