//! Scheduler — fires a callback once a day at a wall-clock `HH:MM`.

use std::future::Future;

use chrono::{Duration as ChronoDuration, Local, NaiveTime, Timelike};
use tokio::task::JoinHandle;

use crate::cancellation::CancelHandle;

/// Compute the duration from `now` until the next future instant whose
/// local wall-clock time matches `hour:minute`. If `now`'s time-of-day is
/// exactly `hour:minute`, the *next* day's occurrence is chosen (never
/// fires immediately on construction).
fn duration_until_next(hour: u32, minute: u32) -> std::time::Duration {
    let now = Local::now();
    let target_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let today_target = now.date_naive().and_time(target_time);
    let mut target = today_target;
    if target <= now.naive_local() {
        target += ChronoDuration::days(1);
    }
    (target - now.naive_local())
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}

/// A single-shot recurring daily timer. `Stop` is idempotent: dropping or
/// calling [`Scheduler::stop`] more than once is harmless.
pub struct Scheduler {
    cancel: CancelHandle,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start a background loop that invokes `callback` every day at
    /// `hour:minute` local time. The callback runs to completion before the
    /// timer re-arms for the following day.
    pub fn start<F, Fut>(hour: u32, minute: u32, mut callback: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let cancel = CancelHandle::new();
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                let wait = duration_until_next(hour, minute);
                log::info!("scheduler: next refresh in {wait:?}");
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    () = loop_cancel.cancelled() => break,
                }
                if loop_cancel.is_cancelled() {
                    break;
                }
                callback().await;
            }
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel the timer and stop the background task. Safe to call more
    /// than once.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Exposed for tests and for components that want to share the same
/// "next HH:MM" computation the scheduler uses.
#[must_use]
pub fn next_fire_in(hour: u32, minute: u32) -> std::time::Duration {
    duration_until_next(hour, minute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn next_fire_is_never_negative_or_instant() {
        let now = Local::now();
        let wait = duration_until_next(now.hour(), now.minute());
        assert!(wait >= std::time::Duration::from_secs(1));
        assert!(wait <= std::time::Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c2 = counter.clone();
        let mut scheduler = Scheduler::start(23, 59, move || {
            let c3 = c2.clone();
            async move {
                c3.fetch_add(1, Ordering::SeqCst);
            }
        });
        scheduler.stop();
        scheduler.stop();
    }
}
