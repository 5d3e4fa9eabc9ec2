//! Refresh Watcher — polls a sentinel file (`cache/refresh_now`) for
//! ad-hoc refresh requests.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cancellation::CancelHandle;
use crate::catalog::Selector;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// A long-running poll loop. `Stop` (via [`Watcher::stop`] or `Drop`) is
/// idempotent.
pub struct Watcher {
    cancel: CancelHandle,
    handle: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Start polling `sentinel_path` at `poll_interval` (default 30s if
    /// `None`). On each tick: if the file is present, read its body, delete
    /// it best-effort, and invoke `on_trigger` with the parsed selection
    /// unless `is_busy` reports the orchestrator already has a refresh in
    /// flight, in which case the request is logged and dropped.
    pub fn start<B, T, Fut>(
        sentinel_path: impl Into<PathBuf>,
        poll_interval: Option<Duration>,
        is_busy: B,
        mut on_trigger: T,
    ) -> Self
    where
        B: Fn() -> bool + Send + 'static,
        T: FnMut(Vec<Selector>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let sentinel_path = sentinel_path.into();
        let interval = poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        let cancel = CancelHandle::new();
        let loop_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                if loop_cancel.sleep_checking(interval).await {
                    break;
                }

                let body = match tokio::fs::read_to_string(&sentinel_path).await {
                    Ok(body) => body,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        log::warn!("watcher: failed to read {}: {e}", sentinel_path.display());
                        continue;
                    }
                };

                if let Err(e) = tokio::fs::remove_file(&sentinel_path).await {
                    log::warn!(
                        "watcher: failed to delete {} (continuing): {e}",
                        sentinel_path.display()
                    );
                }

                if is_busy() {
                    log::info!("watcher: refresh already in progress, dropping trigger");
                    continue;
                }

                let selection = Selector::parse_body(&body);
                on_trigger(selection).await;
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}
