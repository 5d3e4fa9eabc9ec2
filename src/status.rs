//! Status record — the scalar summary at `cache/status.json`.
//!
//! Written by two owners: the Orchestrator (in-progress flag, scrape
//! timestamps, failed-fetch bookkeeping) and the Index Builder (the
//! computed metrics). Each owner reads the existing file, mutates only its
//! own fields, and writes the whole thing back, which gives the
//! read-modify-write merge spec.md §4.6 asks for without either owner
//! needing to know the other's shape.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::write_json_atomic;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub before_bytes: u64,
    pub after_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    pub in_progress: bool,
    pub last_scrape_start: Option<DateTime<Utc>>,
    pub last_scrape_end: Option<DateTime<Utc>>,
    pub combination_count: usize,
    pub unique_track_count: usize,
    pub driver_count: usize,
    pub entry_count: usize,
    pub last_index_update: Option<DateTime<Utc>>,
    pub index_build_duration_ms: u64,
    pub memory: MemoryStats,
    pub failed_fetches: Vec<String>,
    pub retried_fetches: usize,
}

#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn load(&self) -> Status {
        std::fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut Status)) -> anyhow::Result<()> {
        let mut status = self.load();
        f(&mut status);
        write_json_atomic(&self.path, &status)
    }

    pub fn set_in_progress(&self, in_progress: bool) -> anyhow::Result<()> {
        self.update(|s| s.in_progress = in_progress)
    }

    pub fn record_scrape_start(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        self.update(|s| {
            s.in_progress = true;
            s.last_scrape_start = Some(at);
        })
    }

    pub fn record_scrape_end(&self, at: DateTime<Utc>, failed: Vec<String>, retried: usize) -> anyhow::Result<()> {
        self.update(|s| {
            s.in_progress = false;
            s.last_scrape_end = Some(at);
            s.failed_fetches = failed;
            s.retried_fetches = retried;
        })
    }

    /// Overlay freshly computed index metrics, leaving orchestrator-owned
    /// fields (`in_progress`, scrape timestamps, failed-fetch list)
    /// untouched.
    pub fn apply_index_metrics(
        &self,
        combination_count: usize,
        unique_track_count: usize,
        driver_count: usize,
        entry_count: usize,
        build_duration: Duration,
        memory: MemoryStats,
    ) -> anyhow::Result<()> {
        self.update(|s| {
            s.combination_count = combination_count;
            s.unique_track_count = unique_track_count;
            s.driver_count = driver_count;
            s.entry_count = entry_count;
            s.last_index_update = Some(Utc::now());
            s.index_build_duration_ms = build_duration.as_millis() as u64;
            s.memory = memory;
        })
    }
}
