//! Harvester — drives the cartesian sweep over the catalog, coordinating
//! the Cache Store, Upstream Client, Fetch Tracker, and Activity Report.
//!
//! Three public entry points ([`Harvester::load_all`],
//! [`Harvester::fetch_all`], [`Harvester::fetch_targeted`]) share one inner
//! per-combination loop ([`Harvester::run_fetch_phase`]); they differ only
//! in which combinations are visited, whether cache freshness gates a
//! fetch, and the [`Origin`] tag applied to activity accounting.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rand::Rng;

use crate::activity::{ActivityReport, Origin};
use crate::cache::{CombinationRecord, Store, WorkingSet};
use crate::cancellation::CancelHandle;
use crate::catalog::{Catalog, CombinationKey, Selector};
use crate::tracker::FetchTracker;
use crate::upstream::UpstreamClient;
use crate::utils::{
    DEFAULT_RATE_LIMIT_MAX_MS, DEFAULT_RATE_LIMIT_MIN_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
    RETRY_REQUEST_TIMEOUT_SECS,
};

const CACHE_LOAD_CONCURRENCY: usize = 10;
const RETRY_PACING: Duration = Duration::from_millis(20);

/// Result of one harvester run: the best-known snapshot in canonical
/// catalog order, whether a fetch phase ran at all, and fetch failure
/// bookkeeping for the status record.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub working_set: WorkingSet,
    pub needs_fetch: bool,
    pub failed: Vec<String>,
    pub retried: usize,
}

fn materialize(map: &HashMap<CombinationKey, CombinationRecord>, order: &[CombinationKey]) -> WorkingSet {
    order
        .iter()
        .filter_map(|key| map.get(key).map(|record| (key.clone(), record.clone())))
        .collect()
}

fn rate_limit_delay() -> Duration {
    let millis = rand::rng().random_range(DEFAULT_RATE_LIMIT_MIN_MS..=DEFAULT_RATE_LIMIT_MAX_MS);
    Duration::from_millis(millis)
}

pub struct Harvester {
    catalog: Catalog,
    store: Store,
    upstream: UpstreamClient,
    tracker: FetchTracker,
    activity_path: std::path::PathBuf,
}

impl Harvester {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        store: Store,
        upstream: UpstreamClient,
        tracker: FetchTracker,
        activity_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self {
            catalog,
            store,
            upstream,
            tracker,
            activity_path: activity_path.into(),
        }
    }

    /// Read every combination in `combos` from the cache store concurrently
    /// (read-only local I/O, so the sequential-sweep rule doesn't apply),
    /// keeping only combinations with non-empty entries.
    async fn parallel_cache_read(
        &self,
        combos: &[CombinationKey],
        cancel: &CancelHandle,
    ) -> HashMap<CombinationKey, CombinationRecord> {
        let results: Vec<(CombinationKey, Option<CombinationRecord>)> = stream::iter(combos.iter().cloned())
            .map(|key| {
                let store = self.store.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (key, None);
                    }
                    match store.read(&key).await {
                        Ok(record) if !record.entries.is_empty() => (key, Some(record)),
                        _ => (key, None),
                    }
                }
            })
            .buffer_unordered(CACHE_LOAD_CONCURRENCY)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(key, record)| record.map(|r| (key, r)))
            .collect()
    }

    /// Fetch every combination in `combos` in catalog order, writing every
    /// attempt (including empty responses) to `temp/`. Returns the updated
    /// working map and the list of keys that failed transiently (candidates
    /// for the retry pass).
    async fn run_fetch_phase(
        &self,
        combos: &[CombinationKey],
        mut working: HashMap<CombinationKey, CombinationRecord>,
        origin: Origin,
        cancel: &CancelHandle,
        activity: &mut ActivityReport,
        skip_fresh: bool,
        mut on_progress: impl FnMut(&HashMap<CombinationKey, CombinationRecord>),
    ) -> (HashMap<CombinationKey, CombinationRecord>, Vec<CombinationKey>) {
        let mut success_count = 0usize;
        let mut transient_failures = Vec::new();

        for key in combos {
            if cancel.is_cancelled() {
                break;
            }
            if skip_fresh && self.store.is_fresh(key).await {
                continue;
            }

            let track_name = self
                .catalog
                .track_name(&key.track_id)
                .unwrap_or_default()
                .to_string();

            match self
                .upstream
                .fetch(
                    cancel,
                    &key.track_id,
                    &key.class_id,
                    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
                )
                .await
            {
                Ok((entries, elapsed)) => {
                    let record = CombinationRecord::new(
                        key.track_id.clone(),
                        key.class_id.clone(),
                        track_name.clone(),
                        entries.clone(),
                    );
                    if let Err(e) = self.store.temp_write(key, &record).await {
                        log::warn!("temp write failed for {key}: {e}");
                    }
                    log::info!(
                        "fetched {key} ({track_name}): {} entries in {elapsed:?} [{origin:?}]",
                        entries.len()
                    );

                    if entries.is_empty() {
                        working.remove(key);
                        continue;
                    }
                    working.insert(key.clone(), record);
                    activity.record_fetch(&key.track_id, &track_name, &key.class_id, origin);
                    success_count += 1;
                    if success_count % 10 == 0 {
                        on_progress(&working);
                    }
                    cancel.sleep_checking(rate_limit_delay()).await;
                }
                Err(e) => {
                    log::warn!("fetch failed for {key}: {e}");
                    if e.is_transient() {
                        transient_failures.push(key.clone());
                    }
                }
            }
        }

        (working, transient_failures)
    }

    /// Bounded retry over the transient failures from a sweep: longer
    /// per-request timeout, tighter inter-call pacing, successes merged
    /// into `working`.
    async fn retry_pass(
        &self,
        failures: Vec<CombinationKey>,
        origin: Origin,
        cancel: &CancelHandle,
        activity: &mut ActivityReport,
        working: &mut HashMap<CombinationKey, CombinationRecord>,
    ) -> Vec<String> {
        let mut still_failed = Vec::new();

        for key in failures {
            if cancel.is_cancelled() {
                still_failed.push(key.to_string());
                continue;
            }
            let track_name = self
                .catalog
                .track_name(&key.track_id)
                .unwrap_or_default()
                .to_string();

            match self
                .upstream
                .fetch(
                    cancel,
                    &key.track_id,
                    &key.class_id,
                    Duration::from_secs(RETRY_REQUEST_TIMEOUT_SECS),
                )
                .await
            {
                Ok((entries, elapsed)) => {
                    log::info!("retry succeeded for {key} in {elapsed:?}");
                    let record = CombinationRecord::new(
                        key.track_id.clone(),
                        key.class_id.clone(),
                        track_name.clone(),
                        entries.clone(),
                    );
                    if let Err(e) = self.store.temp_write(&key, &record).await {
                        log::warn!("temp write failed during retry for {key}: {e}");
                    }
                    if entries.is_empty() {
                        working.remove(&key);
                    } else {
                        working.insert(key.clone(), record);
                        activity.record_fetch(&key.track_id, &track_name, &key.class_id, origin);
                    }
                }
                Err(e) => {
                    log::warn!("retry failed for {key}: {e}");
                    still_failed.push(key.to_string());
                }
            }
            cancel.sleep_checking(RETRY_PACING).await;
        }

        still_failed
    }

    /// Bootstrap + incremental: load whatever is cached, detect gaps, fetch
    /// only what's missing or stale.
    pub async fn load_all(
        &self,
        cancel: &CancelHandle,
        on_cache_complete: impl FnOnce(&WorkingSet, bool),
        mut on_progress: impl FnMut(&WorkingSet),
    ) -> HarvestOutcome {
        let combos: Vec<CombinationKey> = self.catalog.all_combinations().collect();
        tracing::info!(combinations = combos.len(), "starting bootstrap + incremental load");
        let mut activity = ActivityReport::new(self.activity_path.clone());
        self.tracker.record_start(Utc::now()).ok();

        // Phase 1: cache load.
        let loaded = self.parallel_cache_read(&combos, cancel).await;
        let mut working = HashMap::new();
        for key in &combos {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(record) = loaded.get(key) {
                let track_name = self.catalog.track_name(&key.track_id).unwrap_or_default();
                activity.record_cached_load(&key.track_id, track_name, &key.class_id);
                working.insert(key.clone(), record.clone());
            }
        }
        if cancel.is_cancelled() {
            activity.flush().ok();
            return HarvestOutcome {
                working_set: materialize(&working, &combos),
                needs_fetch: false,
                failed: Vec::new(),
                retried: 0,
            };
        }

        // Phase 2: gap detection.
        let mut needs_fetch = false;
        for key in &combos {
            if !self.store.exists(key).await || !self.store.is_fresh(key).await {
                needs_fetch = true;
                break;
            }
        }
        on_cache_complete(&materialize(&working, &combos), needs_fetch);

        let mut failed = Vec::new();
        let mut retried_attempts = 0usize;

        if needs_fetch {
            // Phase 3: fetch.
            let combos_for_progress = combos.clone();
            let (w2, transient) = self
                .run_fetch_phase(
                    &combos,
                    working,
                    Origin::Startup,
                    cancel,
                    &mut activity,
                    true,
                    |w| on_progress(&materialize(w, &combos_for_progress)),
                )
                .await;
            working = w2;
            retried_attempts = transient.len();
            failed = self
                .retry_pass(transient, Origin::Startup, cancel, &mut activity, &mut working)
                .await;

            // Phase 4: promote.
            let promoted = self.store.promote().await;
            log::info!("load_all: promoted {promoted} combination(s)");
        }

        // Phase 5: finalize.
        activity.flush().ok();
        self.tracker.record_end(Utc::now()).ok();

        HarvestOutcome {
            working_set: materialize(&working, &combos),
            needs_fetch,
            failed,
            retried: retried_attempts,
        }
    }

    /// Force-full: refetch every combination unconditionally.
    pub async fn fetch_all(
        &self,
        cancel: &CancelHandle,
        origin: Origin,
        on_progress: impl FnMut(&WorkingSet),
    ) -> HarvestOutcome {
        let combos: Vec<CombinationKey> = self.catalog.all_combinations().collect();
        self.run_force(combos, origin, cancel, on_progress).await
    }

    /// Force-targeted: refetch only the combinations named by `selection`.
    pub async fn fetch_targeted(
        &self,
        cancel: &CancelHandle,
        selection: &[Selector],
        origin: Origin,
        on_progress: impl FnMut(&WorkingSet),
    ) -> HarvestOutcome {
        let combos = self.catalog.filtered_combinations(selection);
        self.run_force(combos, origin, cancel, on_progress).await
    }

    /// Shared body of `fetchAll`/`fetchTargeted`: a pure cache-read
    /// baseline over the *full* catalog, fetched results merged over it by
    /// key, so periodic indexing during a force refresh never regresses to
    /// a smaller snapshot than the one already on disk.
    async fn run_force(
        &self,
        combos: Vec<CombinationKey>,
        origin: Origin,
        cancel: &CancelHandle,
        mut on_progress: impl FnMut(&WorkingSet),
    ) -> HarvestOutcome {
        let all_combos: Vec<CombinationKey> = self.catalog.all_combinations().collect();
        tracing::info!(targeted = combos.len(), total = all_combos.len(), ?origin, "starting force refresh");
        let mut activity = ActivityReport::new(self.activity_path.clone());
        self.tracker.record_start(Utc::now()).ok();

        let mut working = self.parallel_cache_read(&all_combos, cancel).await;

        let all_combos_for_progress = all_combos.clone();
        let (w2, transient) = self
            .run_fetch_phase(&combos, working, origin, cancel, &mut activity, false, |w| {
                on_progress(&materialize(w, &all_combos_for_progress));
            })
            .await;
        working = w2;
        let retried_attempts = transient.len();
        let failed = self
            .retry_pass(transient, origin, cancel, &mut activity, &mut working)
            .await;

        let promoted = self.store.promote().await;
        log::info!("force refresh: promoted {promoted} combination(s)");

        activity.flush().ok();
        self.tracker.record_end(Utc::now()).ok();

        HarvestOutcome {
            working_set: materialize(&working, &all_combos),
            needs_fetch: true,
            failed,
            retried: retried_attempts,
        }
    }
}
