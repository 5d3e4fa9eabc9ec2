//! Quantified invariants 2 and 8 from spec.md §8, exercised across
//! successive promote cycles rather than a single call.

use lapcache_harvester::cache::{CombinationRecord, Store};
use lapcache_harvester::catalog::CombinationKey;

fn record(name: &str) -> CombinationRecord {
    CombinationRecord::new("1693", "8600", "Nordschleife", vec![
        serde_json::json!({"driver": {"name": name}}).as_object().unwrap().clone(),
    ])
}

#[tokio::test]
async fn promote_never_decreases_the_main_file_count() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::new(dir.path().join("main"), dir.path().join("temp"));

    // Idempotence: promoting an empty temp_root is a no-op.
    assert_eq!(store.promote().await, 0);
    assert_eq!(store.count_present().await, 0);

    let a = CombinationKey::new("1693", "8600");
    let b = CombinationKey::new("5276", "9000");

    store.temp_write(&a, &record("A")).await.unwrap();
    let before = store.count_present().await;
    let promoted_first = store.promote().await;
    let after_first = store.count_present().await;
    assert_eq!(promoted_first, 1);
    assert!(after_first >= before);

    // A second promote cycle with a new key must only add to main/, never
    // remove the combination promoted in the first cycle.
    store.temp_write(&b, &record("B")).await.unwrap();
    let promoted_second = store.promote().await;
    let after_second = store.count_present().await;
    assert_eq!(promoted_second, 1);
    assert!(after_second >= after_first);
    assert!(store.exists(&a).await);
    assert!(store.exists(&b).await);

    // Idempotence again: nothing left in temp/, so the next promote is a no-op.
    assert_eq!(store.promote().await, 0);
    assert_eq!(store.count_present().await, after_second);
}
