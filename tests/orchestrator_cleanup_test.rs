//! Quantified invariant 4 from spec.md §8: after any `cleanup()` the
//! in-progress flag is false and the in-flight refresh's context is
//! cancelled. Proven here by racing a fetch against an address that never
//! responds (`10.255.255.1`, non-routable) and observing `cleanup()` stop
//! the sweep promptly rather than waiting out the 90s request timeout.

mod common;

use std::time::Duration;

use lapcache_harvester::cache::Store;
use lapcache_harvester::{Orchestrator, UpstreamClient};

#[tokio::test]
async fn cleanup_cancels_in_flight_refresh_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    std::fs::create_dir_all(&cache_dir).unwrap();

    let catalog = common::one_combo_catalog();
    let store = Store::new(cache_dir.join("main"), dir.path().join("cache_temp"));
    let upstream = UpstreamClient::new("http://10.255.255.1").unwrap();
    let orchestrator = Orchestrator::new(catalog, store, upstream, cache_dir, Duration::from_secs(3600));

    orchestrator.start_background_load();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(orchestrator.is_in_progress(), "sweep should still be attempting the unreachable fetch");

    orchestrator.cleanup();

    let cancelled_promptly = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if !orchestrator.is_in_progress() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .is_ok();

    assert!(cancelled_promptly, "cleanup() must cancel the in-flight context, not wait out the request timeout");
    assert!(orchestrator.snapshot().is_empty());
}
