//! Static Catalog — the fixed universe of tracks and car classes.
//!
//! Read-only. In production this table is generated from the upstream
//! service's metadata endpoints ahead of time and baked in; this crate
//! treats it as an injected, already-resolved list (the distillation's
//! "external collaborator" boundary applies here too: discovering *which*
//! tracks and classes exist is not part of the harvester's job, only
//! iterating the ones it's given).

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One track in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    pub track_name: String,
}

/// One car class in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarClass {
    pub class_id: String,
    pub class_name: String,
}

/// A single (track, class) combination key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombinationKey {
    pub track_id: String,
    pub class_id: String,
}

impl CombinationKey {
    #[must_use]
    pub fn new(track_id: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            class_id: class_id.into(),
        }
    }
}

impl std::fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.track_id, self.class_id)
    }
}

/// The full track x class universe.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    classes: Vec<CarClass>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    tracks: Vec<Track>,
    classes: Vec<CarClass>,
}

impl Catalog {
    #[must_use]
    pub fn new(tracks: Vec<Track>, classes: Vec<CarClass>) -> Self {
        Self { tracks, classes }
    }

    /// Parse a `{tracks:[...], classes:[...]}` document into a catalog.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let doc: CatalogDocument = serde_json::from_slice(bytes)?;
        Ok(Self::new(doc.tracks, doc.classes))
    }

    /// Load the catalog from disk. Unlike `Config::load`, a missing or
    /// unparseable catalog is fatal at startup: with no tracks or classes
    /// the harvester has nothing to iterate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read catalog at {}: {e}", path.display()))?;
        Self::from_json(&bytes)
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn classes(&self) -> &[CarClass] {
        &self.classes
    }

    #[must_use]
    pub fn track_name(&self, track_id: &str) -> Option<&str> {
        self.tracks
            .iter()
            .find(|t| t.track_id == track_id)
            .map(|t| t.track_name.as_str())
    }

    #[must_use]
    pub fn class_name(&self, class_id: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.class_id == class_id)
            .map(|c| c.class_name.as_str())
    }

    /// All (track, class) combinations, tracks outer / classes inner, the
    /// canonical iteration order used by the harvester (spec.md §5
    /// "Ordering guarantees").
    pub fn all_combinations(&self) -> impl Iterator<Item = CombinationKey> + '_ {
        self.tracks.iter().flat_map(move |t| {
            self.classes
                .iter()
                .map(move |c| CombinationKey::new(t.track_id.clone(), c.class_id.clone()))
        })
    }

    /// Combinations filtered by a selection list from the trigger-file
    /// grammar: bare track IDs mean "all classes of this track", and
    /// `track-class` tokens mean exactly that pair.
    pub fn filtered_combinations(&self, selection: &[Selector]) -> Vec<CombinationKey> {
        let mut out = Vec::new();
        for sel in selection {
            match sel {
                Selector::Track(track_id) => {
                    for c in &self.classes {
                        out.push(CombinationKey::new(track_id.clone(), c.class_id.clone()));
                    }
                }
                Selector::Pair(track_id, class_id) => {
                    out.push(CombinationKey::new(track_id.clone(), class_id.clone()));
                }
            }
        }
        out
    }
}

/// A parsed trigger-file token: either "all classes of a track" or an
/// exact (track, class) pair. See spec.md §4.5 / §6 "Trigger file grammar".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Track(String),
    Pair(String, String),
}

impl Selector {
    /// Parse a single whitespace-delimited token: `<digits>` or
    /// `<digits>-<digits>`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if let Some((track, class)) = token.split_once('-') {
            if !track.is_empty() && !class.is_empty() {
                return Some(Self::Pair(track.to_string(), class.to_string()));
            }
            return None;
        }
        Some(Self::Track(token.to_string()))
    }

    /// Parse a whole trigger-file body into a token list. An empty or
    /// all-whitespace body parses to an empty list, signalling "full
    /// refresh" to the caller.
    #[must_use]
    pub fn parse_body(body: &str) -> Vec<Self> {
        body.split_whitespace().filter_map(Self::parse).collect()
    }
}
