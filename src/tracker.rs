//! Fetch Tracker — a small on-disk record of the last harvest's
//! start/end timestamps (`cache/fetch_timestamps.json`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::write_json_atomic;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchTimestamps {
    pub last_fetch_start: Option<DateTime<Utc>>,
    pub last_fetch_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FetchTracker {
    path: PathBuf,
}

impl FetchTracker {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current timestamps; a missing or corrupt file reads as
    /// default (both `None`) rather than an error, since no run has
    /// recorded anything yet.
    pub fn load(&self) -> FetchTimestamps {
        std::fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    pub fn record_start(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut timestamps = self.load();
        timestamps.last_fetch_start = Some(at);
        write_json_atomic(&self.path, &timestamps)
    }

    pub fn record_end(&self, at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut timestamps = self.load();
        timestamps.last_fetch_end = Some(at);
        write_json_atomic(&self.path, &timestamps)
    }
}
