//! Activity Report — per-track tally of cache hits and fetches by origin,
//! accumulated during a single run and flushed to
//! `cache/track_activity.json`.
//!
//! Counts are *distinct class IDs observed under that origin this run*,
//! not raw call counts, so re-fetching the same (track, class) twice in one
//! sweep (shouldn't happen, but is defended against) doesn't double-count.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::write_json_atomic;

/// The origin tag attached to a fetch; drives which activity counter
/// advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Startup,
    Nightly,
    Manual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackActivity {
    pub track_id: String,
    pub track_name: String,
    #[serde(default)]
    pub cached_loads: usize,
    #[serde(default)]
    pub fetched_startup: usize,
    #[serde(default)]
    pub fetched_nightly: usize,
    #[serde(default)]
    pub fetched_manual: usize,
    #[serde(default)]
    pub last_processed: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ActivityDocument<'a> {
    updated_at: DateTime<Utc>,
    tracks: &'a [TrackActivity],
}

#[derive(Default)]
struct TrackState {
    track_name: String,
    cached: HashSet<String>,
    startup: HashSet<String>,
    nightly: HashSet<String>,
    manual: HashSet<String>,
    last_processed: Option<DateTime<Utc>>,
}

/// The flush-as-you-go accumulator used by a running harvest.
pub struct ActivityReport {
    path: PathBuf,
    tracks: HashMap<String, TrackState>,
    unflushed: usize,
}

const FLUSH_EVERY: usize = 50;

impl ActivityReport {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tracks: HashMap::new(),
            unflushed: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry(&mut self, track_id: &str, track_name: &str) -> &mut TrackState {
        let state = self.tracks.entry(track_id.to_string()).or_default();
        if state.track_name.is_empty() {
            state.track_name = track_name.to_string();
        }
        state
    }

    /// Record a cache-load hit for one (track, class) during bootstrap.
    pub fn record_cached_load(&mut self, track_id: &str, track_name: &str, class_id: &str) {
        self.entry(track_id, track_name)
            .cached
            .insert(class_id.to_string());
        self.bump_and_maybe_flush();
    }

    /// Record a successful fetch for one (track, class) under `origin`.
    pub fn record_fetch(&mut self, track_id: &str, track_name: &str, class_id: &str, origin: Origin) {
        let now = Utc::now();
        let state = self.entry(track_id, track_name);
        let set = match origin {
            Origin::Startup => &mut state.startup,
            Origin::Nightly => &mut state.nightly,
            Origin::Manual => &mut state.manual,
        };
        set.insert(class_id.to_string());
        state.last_processed = Some(now);
        self.bump_and_maybe_flush();
    }

    fn bump_and_maybe_flush(&mut self) {
        self.unflushed += 1;
        if self.unflushed >= FLUSH_EVERY {
            if let Err(e) = self.flush() {
                log::warn!("activity report flush failed: {e}");
            }
            self.unflushed = 0;
        }
    }

    /// Snapshot the accumulator into the list form and write it atomically,
    /// sorted by track name (spec.md §6).
    pub fn flush(&self) -> anyhow::Result<()> {
        let mut tracks: Vec<TrackActivity> = self
            .tracks
            .iter()
            .map(|(track_id, state)| TrackActivity {
                track_id: track_id.clone(),
                track_name: state.track_name.clone(),
                cached_loads: state.cached.len(),
                fetched_startup: state.startup.len(),
                fetched_nightly: state.nightly.len(),
                fetched_manual: state.manual.len(),
                last_processed: state.last_processed,
            })
            .collect();
        tracks.sort_by(|a, b| a.track_name.cmp(&b.track_name));

        let doc = ActivityDocument {
            updated_at: Utc::now(),
            tracks: &tracks,
        };
        write_json_atomic(&self.path, &doc)
    }
}

/// Read a `track_activity.json` file in either historical shape: a list of
/// [`TrackActivity`], or a map from `trackId` to the same fields with
/// `track_id` omitted from the value (spec.md §9, open question 4).
#[must_use]
pub fn read_dual_format(bytes: &[u8]) -> Vec<TrackActivity> {
    #[derive(Deserialize)]
    struct Document {
        tracks: serde_json::Value,
    }

    let Ok(doc) = serde_json::from_slice::<Document>(bytes) else {
        return Vec::new();
    };

    if let Ok(list) = serde_json::from_value::<Vec<TrackActivity>>(doc.tracks.clone()) {
        return list;
    }

    if let Ok(map) = serde_json::from_value::<HashMap<String, TrackActivity>>(doc.tracks) {
        return map
            .into_iter()
            .map(|(track_id, mut activity)| {
                if activity.track_id.is_empty() {
                    activity.track_id = track_id;
                }
                activity
            })
            .collect();
    }

    Vec::new()
}
