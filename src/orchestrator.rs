//! Orchestrator — owns the single in-flight-refresh flag, the cancellable
//! context for the current refresh, and the published snapshot of
//! combinations. Every control entrypoint (scheduler tick, watcher
//! trigger, manual call) funnels through here, which is what guarantees at
//! most one harvest runs at a time.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::activity::Origin;
use crate::cache::{Store, WorkingSet};
use crate::cancellation::CancelHandle;
use crate::catalog::{Catalog, Selector};
use crate::flag::AtomicFlag;
use crate::harvester::Harvester;
use crate::index::{self, IndexBuilder};
use crate::periodic_indexer::PeriodicIndexer;
use crate::scheduler::Scheduler;
use crate::status::StatusStore;
use crate::tracker::FetchTracker;
use crate::upstream::UpstreamClient;
use crate::watcher::Watcher;

struct Inner {
    catalog: Catalog,
    store: Store,
    harvester: Harvester,
    index_builder: Arc<IndexBuilder>,
    status: StatusStore,
    snapshot: Arc<RwLock<WorkingSet>>,
    in_progress: AtomicFlag,
    cancel: Mutex<CancelHandle>,
    periodic_indexer: Mutex<Option<PeriodicIndexer>>,
    scheduler: Mutex<Option<Scheduler>>,
    watcher: Mutex<Option<Watcher>>,
    indexing_interval: Duration,
}

#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        catalog: Catalog,
        store: Store,
        upstream: UpstreamClient,
        cache_dir: impl Into<PathBuf>,
        indexing_interval: Duration,
    ) -> Self {
        let cache_dir = cache_dir.into();
        let tracker = FetchTracker::new(cache_dir.join("fetch_timestamps.json"));
        let activity_path = cache_dir.join("track_activity.json");
        let status = StatusStore::new(cache_dir.join("status.json"));
        let harvester = Harvester::new(catalog.clone(), store.clone(), upstream, tracker, activity_path);
        let index_builder = Arc::new(IndexBuilder::new(cache_dir, status.clone()));

        Self {
            inner: Arc::new(Inner {
                catalog,
                store,
                harvester,
                index_builder,
                status,
                snapshot: Arc::new(RwLock::new(Vec::new())),
                in_progress: AtomicFlag::new(false),
                cancel: Mutex::new(CancelHandle::new()),
                periodic_indexer: Mutex::new(None),
                scheduler: Mutex::new(None),
                watcher: Mutex::new(None),
                indexing_interval,
            }),
        }
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.inner.in_progress.get()
    }

    #[must_use]
    pub fn snapshot(&self) -> WorkingSet {
        self.inner.snapshot.read().clone()
    }

    #[must_use]
    pub fn status(&self) -> crate::status::Status {
        self.inner.status.load()
    }

    pub fn start_scheduler(&self, refresh_hour: u32, refresh_minute: u32) {
        let this = self.clone();
        let scheduler = Scheduler::start(refresh_hour, refresh_minute, move || {
            let this = this.clone();
            async move {
                this.on_triggered(None, Origin::Nightly).await;
            }
        });
        *self.inner.scheduler.lock() = Some(scheduler);
    }

    pub fn start_watcher(&self, sentinel_path: impl Into<PathBuf>, poll_interval: Option<Duration>) {
        let busy = self.clone();
        let trigger = self.clone();
        let watcher = Watcher::start(
            sentinel_path,
            poll_interval,
            move || busy.is_in_progress(),
            move |selection| {
                let this = trigger.clone();
                async move {
                    let selection = (!selection.is_empty()).then_some(selection);
                    this.on_triggered(selection, Origin::Manual).await;
                }
            },
        );
        *self.inner.watcher.lock() = Some(watcher);
    }

    /// Launch the bootstrap + incremental load in the background. Returns
    /// immediately; the refresh itself runs on a spawned task.
    pub fn start_background_load(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            this.run_background_load().await;
        });
    }

    async fn run_background_load(&self) {
        if self.inner.in_progress.get() {
            log::info!("start_background_load: a refresh is already in progress");
            return;
        }
        self.inner.in_progress.set(true);
        self.inner.status.record_scrape_start(Utc::now()).ok();

        let cancel = CancelHandle::new();
        *self.inner.cancel.lock() = cancel.clone();

        let on_cache_complete = {
            let this = self.clone();
            move |working_set: &WorkingSet, _needs_fetch: bool| {
                *this.inner.snapshot.write() = working_set.clone();
                this.start_periodic_indexing();
            }
        };
        let on_progress = {
            let this = self.clone();
            move |working_set: &WorkingSet| {
                *this.inner.snapshot.write() = working_set.clone();
            }
        };

        let outcome = self
            .inner
            .harvester
            .load_all(&cancel, on_cache_complete, on_progress)
            .await;

        self.finish_refresh(outcome).await;
    }

    /// `selection` of `None` means a full refresh; `Some` means a targeted
    /// subset parsed from a trigger-file body.
    pub async fn on_triggered(&self, selection: Option<Vec<Selector>>, origin: Origin) {
        if self.inner.in_progress.get() {
            log::info!("on_triggered: refresh already in progress, dropping trigger ({origin:?})");
            return;
        }
        self.inner.in_progress.set(true);
        self.inner.status.record_scrape_start(Utc::now()).ok();

        let cancel = CancelHandle::new();
        *self.inner.cancel.lock() = cancel.clone();
        self.start_periodic_indexing();

        let on_progress = {
            let this = self.clone();
            move |working_set: &WorkingSet| {
                *this.inner.snapshot.write() = working_set.clone();
            }
        };

        let outcome = match selection {
            None => self.inner.harvester.fetch_all(&cancel, origin, on_progress).await,
            Some(sel) => self.inner.harvester.fetch_targeted(&cancel, &sel, origin, on_progress).await,
        };

        self.finish_refresh(outcome).await;
    }

    async fn finish_refresh(&self, outcome: crate::harvester::HarvestOutcome) {
        *self.inner.snapshot.write() = outcome.working_set.clone();
        self.stop_periodic_indexing();

        if let Err(e) = index::build_async(
            self.inner.index_builder.clone(),
            outcome.working_set,
            self.inner.catalog.clone(),
        )
        .await
        {
            log::warn!("finish_refresh: final index build failed: {e}");
        }

        self.inner.in_progress.set(false);
        self.inner
            .status
            .record_scrape_end(Utc::now(), outcome.failed, outcome.retried)
            .ok();
    }

    fn start_periodic_indexing(&self) {
        let mut guard = self.inner.periodic_indexer.lock();
        if guard.is_some() {
            return;
        }
        let indexer = PeriodicIndexer::start(
            self.inner.indexing_interval,
            self.inner.store.clone(),
            self.inner.index_builder.clone(),
            self.inner.catalog.clone(),
            self.inner.snapshot.clone(),
            self.inner.in_progress.clone(),
            false,
        );
        *guard = Some(indexer);
    }

    fn stop_periodic_indexing(&self) {
        if let Some(mut indexer) = self.inner.periodic_indexer.lock().take() {
            indexer.stop();
        }
    }

    /// Cancel any in-flight refresh, stop the scheduler/watcher/periodic
    /// indexer, and clear the published snapshot.
    pub fn cleanup(&self) {
        self.inner.cancel.lock().cancel();
        if let Some(mut scheduler) = self.inner.scheduler.lock().take() {
            scheduler.stop();
        }
        if let Some(mut watcher) = self.inner.watcher.lock().take() {
            watcher.stop();
        }
        self.stop_periodic_indexing();
        self.inner.in_progress.set(false);
        self.inner.snapshot.write().clear();
    }
}
