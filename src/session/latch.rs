//! Results-Ready Latch
//!
//! One-shot signal that the authority has aggregated and published all
//! participants' scores.

use std::sync::Arc;

use tokio::sync::watch;

/// One-shot, monotonic latch.
///
/// Set at most once per session: further sets are no-ops, readers observe a
/// monotonic `true`, and the latch is never reset. Safe to share across
/// tasks; this is the only session resource touched outside the controller's
/// owner context.
#[derive(Debug, Clone)]
pub struct ResultsLatch {
    tx: Arc<watch::Sender<bool>>,
}

impl ResultsLatch {
    /// An unset latch.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the latch. Idempotent.
    pub fn set(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the latch has been set.
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the latch is set; immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for inspects the current value before suspending, and the
        // sender lives in self, so this cannot fail while we are waiting
        let _ = rx.wait_for(|set| *set).await;
    }
}

impl Default for ResultsLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_starts_unset() {
        assert!(!ResultsLatch::new().is_set());
    }

    #[test]
    fn test_set_is_idempotent_and_monotonic() {
        let latch = ResultsLatch::new();
        latch.set();
        latch.set();
        assert!(latch.is_set());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_set() {
        let latch = ResultsLatch::new();
        latch.set();
        latch.wait().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_on_set() {
        let latch = ResultsLatch::new();
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };
        latch.set();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_all_readers_observe_a_single_set() {
        let latch = ResultsLatch::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.wait().await })
            })
            .collect();
        latch.set();
        for waiter in waiters {
            waiter.await.unwrap();
        }
        assert!(latch.is_set());
    }
}
