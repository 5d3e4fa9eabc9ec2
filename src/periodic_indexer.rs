//! Periodic Indexer — re-runs the Index Builder on a fixed cadence while a
//! refresh is in progress, so consumers see freshening artifacts during a
//! multi-hour sweep instead of only at the very end.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::cache::{Store, WorkingSet};
use crate::cancellation::CancelHandle;
use crate::catalog::Catalog;
use crate::flag::AtomicFlag;
use crate::index::IndexBuilder;

async fn build_once(index_builder: Arc<IndexBuilder>, snapshot: Arc<RwLock<WorkingSet>>, catalog: Catalog) {
    let snap = snapshot.read().clone();
    if let Err(e) = crate::index::build_async(index_builder, snap, catalog).await {
        log::warn!("periodic indexer: build failed: {e}");
    }
}

pub struct PeriodicIndexer {
    cancel: CancelHandle,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicIndexer {
    /// Start the loop. `already_exported` should be `true` when the caller
    /// already ran the Index Builder once for this run (e.g. the
    /// bootstrap's cache-complete callback), so the immediate on-start
    /// build is skipped.
    pub fn start(
        interval: Duration,
        store: Store,
        index_builder: Arc<IndexBuilder>,
        catalog: Catalog,
        snapshot: Arc<RwLock<WorkingSet>>,
        in_progress: AtomicFlag,
        already_exported: bool,
    ) -> Self {
        let cancel = CancelHandle::new();
        let loop_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            if in_progress.get() && !already_exported && !snapshot.read().is_empty() {
                build_once(index_builder.clone(), snapshot.clone(), catalog.clone()).await;
            }

            loop {
                if loop_cancel.sleep_checking(interval).await {
                    break;
                }
                if !in_progress.get() || loop_cancel.is_cancelled() {
                    break;
                }

                let promoted = store.promote().await;
                log::info!("periodic indexer: promoted {promoted} combination(s)");
                build_once(index_builder.clone(), snapshot.clone(), catalog.clone()).await;
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

impl Drop for PeriodicIndexer {
    fn drop(&mut self) {
        self.stop();
    }
}
