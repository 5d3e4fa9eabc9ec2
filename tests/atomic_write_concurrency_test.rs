//! Quantified invariant 9 from spec.md §8: no reader of `driver_index.json`
//! (or any atomically-written artifact) can observe a truncated or
//! syntactically invalid file even while a write is in progress, because
//! every write lands via temp-file-then-rename rather than an in-place
//! overwrite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lapcache_harvester::utils::write_json_atomic;

#[tokio::test]
async fn concurrent_reads_never_observe_a_torn_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("driver_index.json");
    let stop = Arc::new(AtomicBool::new(false));

    let writer_path = path.clone();
    let writer_stop = stop.clone();
    let writer = tokio::task::spawn_blocking(move || {
        for i in 0..500usize {
            if writer_stop.load(Ordering::SeqCst) {
                break;
            }
            // Vary the payload size so a non-atomic write would be more
            // likely to be caught mid-write by a concurrent reader.
            let entries: Vec<String> = (0..(i % 200)).map(|n| format!("driver-{n}")).collect();
            let doc = serde_json::json!({ "iteration": i, "drivers": entries });
            write_json_atomic(&writer_path, &doc).unwrap();
        }
    });

    let reader_path = path.clone();
    let reader_stop = stop.clone();
    let reader = tokio::task::spawn_blocking(move || {
        let mut observations = 0usize;
        for _ in 0..2000 {
            match std::fs::read(&reader_path) {
                Ok(bytes) => {
                    observations += 1;
                    let parsed: Result<serde_json::Value, _> = serde_json::from_slice(&bytes);
                    assert!(parsed.is_ok(), "observed a syntactically invalid JSON file mid-write");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => panic!("unexpected read error: {e}"),
            }
        }
        reader_stop.store(true, Ordering::SeqCst);
        observations
    });

    writer.await.unwrap();
    let observations = reader.await.unwrap();
    assert!(observations > 0, "reader never observed a written file");
}
