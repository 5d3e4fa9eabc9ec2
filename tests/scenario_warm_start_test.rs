//! S2 — warm start, all fresh: bootstrap loads everything from `main/`, gap
//! detection finds nothing stale, and no outbound HTTP call is ever made.
//! The index builder still runs once and produces artifacts.

mod common;

use lapcache_harvester::cache::{CombinationRecord, Store};
use lapcache_harvester::cancellation::CancelHandle;
use lapcache_harvester::catalog::CombinationKey;
use lapcache_harvester::harvester::Harvester;
use lapcache_harvester::index::IndexBuilder;
use lapcache_harvester::status::StatusStore;
use lapcache_harvester::tracker::FetchTracker;
use lapcache_harvester::UpstreamClient;

#[tokio::test]
async fn warm_start_skips_fetch_and_still_builds_index() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = common::one_combo_catalog();
    let key = CombinationKey::new("1693", "8600");

    let store = Store::new(dir.path().join("main"), dir.path().join("temp"));
    let record = CombinationRecord::new(
        "1693",
        "8600",
        "Nordschleife",
        vec![common::driver_entry("Ludo Flender").as_object().unwrap().clone()],
    );
    store.write(&key, &record).await.unwrap();

    // Unreachable base URL: if the harvester attempted an outbound call,
    // this would fail fast rather than silently succeeding.
    let upstream = UpstreamClient::new("http://127.0.0.1:1").unwrap();
    let tracker = FetchTracker::new(dir.path().join("fetch_timestamps.json"));
    let harvester = Harvester::new(
        catalog.clone(),
        store.clone(),
        upstream,
        tracker,
        dir.path().join("track_activity.json"),
    );

    let cancel = CancelHandle::new();
    let mut saw_needs_fetch = None;
    let outcome = harvester
        .load_all(
            &cancel,
            |_, needs_fetch| saw_needs_fetch = Some(needs_fetch),
            |_| {},
        )
        .await;

    assert_eq!(saw_needs_fetch, Some(false));
    assert!(!outcome.needs_fetch);
    assert_eq!(outcome.working_set.len(), 1);

    let status = StatusStore::new(dir.path().join("status.json"));
    let builder = IndexBuilder::new(dir.path(), status);
    let index_outcome = builder
        .build(&outcome.working_set, |id| catalog.class_name(id).unwrap_or_default().to_string())
        .unwrap();

    assert_eq!(index_outcome.combination_count, 1);
    assert_eq!(index_outcome.driver_count, 1);
    assert!(builder.driver_index_path().exists());
}
