//! A hand-rolled cancellation token, matching the teacher's
//! `search::indexer::CancellationHandle`: an `Arc<AtomicBool>` plus a
//! polling wait, rather than `tokio_util::sync::CancellationToken`.
//!
//! Every suspension point in this crate (HTTP call, disk I/O, rate-limit
//! pause, timer wait) is expected to race against [`CancelHandle::cancelled`]
//! or call [`CancelHandle::is_cancelled`] at least every 100ms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested. Intended for use in
    /// `tokio::select!` alongside the work being cancelled.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Sleep for `dur`, polling for cancellation along the way. Returns
    /// `true` if the sleep was cut short by cancellation.
    pub async fn sleep_checking(&self, dur: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + dur;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(std::cmp::min(POLL_INTERVAL, deadline - now)).await;
        }
    }
}
