//! S3 — nightly refresh interrupted mid-sweep: a leftover file remains
//! under `temp/` from a killed run. Bootstrap on the next startup reads
//! `main/` unaffected by the leftover. The next nightly refresh overwrites
//! the leftover in `temp/` before promoting it into `main/`.

mod common;

use lapcache_harvester::cache::{CombinationRecord, Store};
use lapcache_harvester::cancellation::CancelHandle;
use lapcache_harvester::catalog::CombinationKey;
use lapcache_harvester::harvester::Harvester;
use lapcache_harvester::tracker::FetchTracker;
use lapcache_harvester::UpstreamClient;

#[tokio::test]
async fn interrupted_run_leftover_is_overwritten_before_next_promote() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = common::one_combo_catalog();
    let key = CombinationKey::new("1693", "8600");

    let store = Store::new(dir.path().join("main"), dir.path().join("temp"));

    let original = CombinationRecord::new(
        "1693",
        "8600",
        "Nordschleife",
        vec![common::driver_entry("Old Driver").as_object().unwrap().clone()],
    );
    store.write(&key, &original).await.unwrap();

    // Simulate a kill mid-sweep: a half-written record sits in temp/.
    let leftover = CombinationRecord::new(
        "1693",
        "8600",
        "Nordschleife",
        vec![common::driver_entry("Leftover Driver").as_object().unwrap().clone()],
    );
    store.temp_write(&key, &leftover).await.unwrap();

    // Bootstrap on the next startup: main/ is unaffected by the leftover.
    let bootstrap = store.read(&key).await.unwrap();
    assert_eq!(bootstrap.entries[0]["driver"]["name"], "Old Driver");

    // The next nightly refresh fetches fresh data and promotes over the leftover.
    let mut server = mockito::Server::new_async().await;
    let (_page, _listing) =
        common::mount_combo(&mut server, "1693", "8600", vec![common::driver_entry("New Driver")]).await;

    let upstream = UpstreamClient::new(server.url()).unwrap();
    let tracker = FetchTracker::new(dir.path().join("fetch_timestamps.json"));
    let harvester = Harvester::new(
        catalog,
        store.clone(),
        upstream,
        tracker,
        dir.path().join("track_activity.json"),
    );

    let cancel = CancelHandle::new();
    let outcome = harvester
        .fetch_all(&cancel, lapcache_harvester::activity::Origin::Nightly, |_| {})
        .await;

    assert!(outcome.failed.is_empty());
    let promoted = store.read(&key).await.unwrap();
    assert_eq!(promoted.entries.len(), 1);
    assert_eq!(promoted.entries[0]["driver"]["name"], "New Driver");
}
