//! Shared helpers: atomic file writes and a handful of constants.
//!
//! Every on-disk artifact in this crate (cache blobs, `driver_index.json`,
//! `status.json`, ...) goes through [`write_atomic`], the same
//! temp-file-then-rename shape the teacher uses in
//! `content_saver::compression::save_compressed_file`.

use std::path::Path;

use tempfile::NamedTempFile;

/// Default freshness window for a cached combination.
pub const DEFAULT_MAX_AGE: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Default inter-fetch rate-limit pause.
pub const DEFAULT_RATE_LIMIT_MIN_MS: u64 = 50;
pub const DEFAULT_RATE_LIMIT_MAX_MS: u64 = 200;

/// Default per-request timeout (normal pass).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
/// Per-request timeout used during the retry pass.
pub const RETRY_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default periodic-indexing cadence, minutes.
pub const DEFAULT_INDEXING_MINUTES: u64 = 30;

/// Top-combinations truncation limit.
pub const TOP_COMBINATIONS_LIMIT: usize = 1000;

/// Write `bytes` to `path` atomically: write to a sibling temp file in the
/// same directory, then rename over the target. Falls back to a direct
/// overwrite if the rename fails (e.g. the target is held open on some
/// platforms), matching spec.md's documented fallback policy.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    use std::io::Write;
    temp.write_all(bytes)?;
    temp.flush()?;

    match temp.persist(path) {
        Ok(_) => Ok(()),
        Err(persist_err) => {
            log::warn!(
                "atomic rename failed for {}: {persist_err}; falling back to direct write",
                path.display()
            );
            let file = persist_err.file;
            std::fs::write(path, bytes)?;
            // best-effort cleanup of the leftover temp file
            drop(file);
            Ok(())
        }
    }
}

/// Serialize `value` to pretty JSON and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)?;
    Ok(())
}
