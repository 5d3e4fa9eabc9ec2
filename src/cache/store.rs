//! On-disk, content-addressed cache store.
//!
//! Two parallel roots — `main/` (read by the index builder) and `temp/`
//! (write buffer during a refresh) — with identical layout:
//! `root/track_<trackID>/class_<classID>.blob`, a gzip-compressed pretty
//! JSON document (spec.md §6). Grounded on
//! `content_saver::compression::save_compressed_file` for the
//! atomic-write shape and `content_saver::cache_check` for the
//! age/freshness checks.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::catalog::CombinationKey;
use crate::error::CacheError;
use crate::utils::{write_atomic, DEFAULT_MAX_AGE};

use super::compression::{compress, decompress};
use super::record::CombinationRecord;

fn relative_path_for(key: &CombinationKey) -> PathBuf {
    PathBuf::from(format!("track_{}", key.track_id)).join(format!("class_{}.blob", key.class_id))
}

/// A single cache root (either `main/` or `temp/`).
#[derive(Debug, Clone)]
pub struct CacheRoot {
    root: PathBuf,
}

impl CacheRoot {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, key: &CombinationKey) -> PathBuf {
        self.root.join(relative_path_for(key))
    }

    /// Whether the combination is present on disk.
    pub async fn exists(&self, key: &CombinationKey) -> bool {
        tokio::fs::metadata(self.full_path(key)).await.is_ok()
    }

    /// Age of the cached file, or `None` if it doesn't exist.
    pub async fn age(&self, key: &CombinationKey) -> Option<Duration> {
        let meta = tokio::fs::metadata(self.full_path(key)).await.ok()?;
        let modified = meta.modified().ok()?;
        Some(SystemTime::now().duration_since(modified).unwrap_or_default())
    }

    /// Whether the entry exists and is younger than `max_age`.
    pub async fn is_fresh(&self, key: &CombinationKey, max_age: Duration) -> bool {
        match self.age(key).await {
            Some(age) => age < max_age,
            None => false,
        }
    }

    /// Read and decode a combination. Corrupt data is reported as
    /// [`CacheError::Decompress`]/[`CacheError::Serialize`] so the caller
    /// can treat it as "missing" and refetch, per spec.md §7.
    pub async fn read(&self, key: &CombinationKey) -> Result<CombinationRecord, CacheError> {
        let path = self.full_path(key);
        let compressed = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CacheError::Missing
            } else {
                CacheError::Io(e)
            }
        })?;
        let bytes = decompress(compressed)
            .await
            .map_err(|e| CacheError::Decompress(e.to_string()))?;
        CombinationRecord::from_json_slice(&bytes).map_err(CacheError::from)
    }

    /// Write a combination atomically (temp-file-then-rename within this
    /// root's directory).
    pub async fn write(
        &self,
        key: &CombinationKey,
        record: &CombinationRecord,
    ) -> Result<(), CacheError> {
        let path = self.full_path(key);
        let json = record.to_json_bytes()?;
        let compressed = compress(json).await?;
        let path_owned = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path_owned, &compressed))
            .await
            .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))??;
        Ok(())
    }

    /// Count combinations present under this root by walking the tree.
    pub async fn count_present(&self) -> usize {
        walk_blob_files(&self.root).await.len()
    }

    /// Combination count and oldest/newest file modification time under
    /// this root, for the startup reconciliation log.
    pub async fn reconciliation_summary(&self) -> ReconciliationSummary {
        let files = walk_blob_files(&self.root).await;
        let mut oldest: Option<SystemTime> = None;
        let mut newest: Option<SystemTime> = None;
        for file in &files {
            let Ok(meta) = tokio::fs::metadata(file).await else {
                continue;
            };
            let Ok(modified) = meta.modified() else {
                continue;
            };
            oldest = Some(oldest.map_or(modified, |o| o.min(modified)));
            newest = Some(newest.map_or(modified, |n| n.max(modified)));
        }
        ReconciliationSummary {
            combination_count: files.len(),
            oldest,
            newest,
        }
    }

    /// Remove this root entirely.
    pub async fn clear(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}

/// Summary of `main/`'s on-disk state at process start, logged once before
/// the bootstrap load begins so operators can see what's already being
/// served while the first sweep runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationSummary {
    pub combination_count: usize,
    pub oldest: Option<SystemTime>,
    pub newest: Option<SystemTime>,
}

/// Recursively collect `.blob` file paths under `dir`. Missing directories
/// yield an empty list rather than an error (an unpopulated cache root is
/// a normal cold-start state, not a failure).
async fn walk_blob_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => stack.push(path),
                Ok(ft) if ft.is_file() => {
                    if path.extension().and_then(|e| e.to_str()) == Some("blob") {
                        out.push(path);
                    }
                }
                _ => {}
            }
        }
    }
    out
}

/// The full cache store: a readable `main/` root and a write-buffer
/// `temp/` root, with atomic promotion from one to the other.
#[derive(Debug, Clone)]
pub struct Store {
    pub main: CacheRoot,
    pub temp: CacheRoot,
}

impl Store {
    #[must_use]
    pub fn new(main_root: impl Into<PathBuf>, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            main: CacheRoot::new(main_root),
            temp: CacheRoot::new(temp_root),
        }
    }

    pub async fn exists(&self, key: &CombinationKey) -> bool {
        self.main.exists(key).await
    }

    pub async fn age(&self, key: &CombinationKey) -> Option<Duration> {
        self.main.age(key).await
    }

    pub async fn is_fresh(&self, key: &CombinationKey) -> bool {
        self.main.is_fresh(key, DEFAULT_MAX_AGE).await
    }

    pub async fn read(&self, key: &CombinationKey) -> Result<CombinationRecord, CacheError> {
        self.main.read(key).await
    }

    pub async fn write(&self, key: &CombinationKey, record: &CombinationRecord) -> Result<(), CacheError> {
        self.main.write(key, record).await
    }

    pub async fn count_present(&self) -> usize {
        self.main.count_present().await
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.main.clear().await
    }

    pub async fn temp_write(
        &self,
        key: &CombinationKey,
        record: &CombinationRecord,
    ) -> Result<(), CacheError> {
        self.temp.write(key, record).await
    }

    /// Move every file under `temp/` to the same relative path under
    /// `main/`, overwriting. Each individual move is atomic; the set as a
    /// whole is not transactional (spec.md §4.2 "Guarantees"). Per-file
    /// errors are logged and skipped; the count of successful promotions
    /// is returned.
    pub async fn promote(&self) -> usize {
        let files = walk_blob_files(self.temp.path()).await;
        let mut promoted = 0usize;
        for src in files {
            let relative = match src.strip_prefix(self.temp.path()) {
                Ok(r) => r.to_path_buf(),
                Err(_) => continue,
            };
            let dst = self.main.path().join(&relative);
            if let Some(parent) = dst.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    log::warn!("promote: failed to create {}: {e}", parent.display());
                    continue;
                }
            }
            match tokio::fs::rename(&src, &dst).await {
                Ok(()) => promoted += 1,
                Err(e) => {
                    log::warn!(
                        "promote: failed to move {} -> {}: {e}",
                        src.display(),
                        dst.display()
                    );
                }
            }
        }
        log::info!("promote: {promoted} combination(s) promoted to main cache");
        promoted
    }
}
