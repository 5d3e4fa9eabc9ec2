//! The persisted shape of one cached combination.
//!
//! Mirrors the on-disk schema from spec.md §6:
//! `{track_info:{name,track_id,class_id,data:[...]}, cached_at, track_name,
//! track_id, entry_count}`. Entries are kept in raw, schemaless form (a map
//! from string to JSON value) so upstream schema drift in fields we don't
//! extract doesn't break round-tripping, per spec.md §9's design note on
//! "raw untyped payloads".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw leaderboard entry as received from upstream, preserved verbatim.
pub type RawEntry = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackInfo {
    name: String,
    track_id: String,
    class_id: String,
    data: Vec<RawEntry>,
}

/// A single (track, class) leaderboard as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationRecord {
    pub track_id: String,
    pub class_id: String,
    pub track_name: String,
    pub entries: Vec<RawEntry>,
    pub cached_at: DateTime<Utc>,
    pub entry_count: usize,
}

impl CombinationRecord {
    #[must_use]
    pub fn new(
        track_id: impl Into<String>,
        class_id: impl Into<String>,
        track_name: impl Into<String>,
        entries: Vec<RawEntry>,
    ) -> Self {
        let entry_count = entries.len();
        Self {
            track_id: track_id.into(),
            class_id: class_id.into(),
            track_name: track_name.into(),
            entries,
            cached_at: Utc::now(),
            entry_count,
        }
    }

    /// Serialize into the on-disk wire shape (§6).
    fn to_wire(&self) -> WireRecord {
        WireRecord {
            track_info: TrackInfo {
                name: self.track_name.clone(),
                track_id: self.track_id.clone(),
                class_id: self.class_id.clone(),
                data: self.entries.clone(),
            },
            cached_at: self.cached_at,
            track_name: self.track_name.clone(),
            track_id: self.track_id.clone(),
            entry_count: self.entry_count,
            class_id: self.class_id.clone(),
        }
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_wire())
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let wire: WireRecord = serde_json::from_slice(bytes)?;
        Ok(Self {
            track_id: wire.track_id,
            class_id: wire.class_id,
            track_name: wire.track_name,
            entries: wire.track_info.data,
            cached_at: wire.cached_at,
            entry_count: wire.entry_count,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRecord {
    track_info: TrackInfo,
    cached_at: DateTime<Utc>,
    track_name: String,
    track_id: String,
    class_id: String,
    entry_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> RawEntry {
        let mut m = serde_json::Map::new();
        m.insert("driver".into(), serde_json::json!({"name": name}));
        m
    }

    #[test]
    fn round_trips_order_and_content() {
        let rec = CombinationRecord::new("1693", "8600", "Nordschleife", vec![entry("A"), entry("B")]);
        let bytes = rec.to_json_bytes().unwrap();
        let back = CombinationRecord::from_json_slice(&bytes).unwrap();
        assert_eq!(back.entries.len(), 2);
        assert_eq!(
            back.entries[0]["driver"]["name"].as_str().unwrap(),
            "A"
        );
        assert_eq!(
            back.entries[1]["driver"]["name"].as_str().unwrap(),
            "B"
        );
        assert_eq!(back.entry_count, 2);
    }

    #[test]
    fn empty_entries_round_trip() {
        let rec = CombinationRecord::new("1693", "8600", "Nordschleife", vec![]);
        let bytes = rec.to_json_bytes().unwrap();
        let back = CombinationRecord::from_json_slice(&bytes).unwrap();
        assert!(back.entries.is_empty());
        assert_eq!(back.entry_count, 0);
    }
}
