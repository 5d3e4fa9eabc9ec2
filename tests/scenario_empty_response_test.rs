//! S5 — upstream returns empty for one combination: the previous `main/`
//! record is left untouched until promote, at which point the reference
//! policy (promote replaces) takes over and the empty record overwrites it.
//! A subsequent index rebuild must not carry forward stale occurrences.

mod common;

use lapcache_harvester::activity::Origin;
use lapcache_harvester::cache::{CombinationRecord, Store};
use lapcache_harvester::cancellation::CancelHandle;
use lapcache_harvester::catalog::CombinationKey;
use lapcache_harvester::harvester::Harvester;
use lapcache_harvester::index::IndexBuilder;
use lapcache_harvester::status::StatusStore;
use lapcache_harvester::tracker::FetchTracker;
use lapcache_harvester::UpstreamClient;

#[tokio::test]
async fn empty_fetch_replaces_stale_data_on_promote() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = common::one_combo_catalog();
    let key = CombinationKey::new("1693", "8600");

    let store = Store::new(dir.path().join("main"), dir.path().join("temp"));
    let stale = CombinationRecord::new(
        "1693",
        "8600",
        "Nordschleife",
        vec![common::driver_entry("Stale Driver").as_object().unwrap().clone()],
    );
    store.write(&key, &stale).await.unwrap();

    let mut server = mockito::Server::new_async().await;
    let (_page, _listing) = common::mount_combo(&mut server, "1693", "8600", vec![]).await;

    let upstream = UpstreamClient::new(server.url()).unwrap();
    let tracker = FetchTracker::new(dir.path().join("fetch_timestamps.json"));
    let harvester = Harvester::new(
        catalog.clone(),
        store.clone(),
        upstream,
        tracker,
        dir.path().join("track_activity.json"),
    );

    let cancel = CancelHandle::new();
    let outcome = harvester.fetch_all(&cancel, Origin::Nightly, |_| {}).await;

    // The working set used for the index never contains the stale occurrence:
    // an empty-entries fetch removes the pre-seeded stale record from `working`
    // instead of leaving it untouched.
    assert!(outcome.working_set.iter().all(|(k, _)| k != &key));

    // Promote replaces main/ with the empty record.
    let after = store.read(&key).await.unwrap();
    assert!(after.entries.is_empty());

    let status = StatusStore::new(dir.path().join("status.json"));
    let builder = IndexBuilder::new(dir.path(), status);
    let index_outcome = builder
        .build(&outcome.working_set, |id| catalog.class_name(id).unwrap_or_default().to_string())
        .unwrap();
    assert_eq!(index_outcome.driver_count, 0);

    let index_bytes = std::fs::read(builder.driver_index_path()).unwrap();
    let index: serde_json::Value = serde_json::from_slice(&index_bytes).unwrap();
    assert!(index.get("stale driver").is_none());
}
