//! Index Builder — rebuilds the driver lookup index and summary artifacts
//! from the published working set.
//!
//! Two passes bound memory: the first counts entries per driver name (and
//! per combination) without storing anything but counters, the second
//! walks the data again to fill pre-sized buckets, so no bucket ever
//! reallocates mid-fill.

pub mod occurrence;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::WorkingSet;
use crate::status::{MemoryStats, StatusStore};
use crate::utils::{write_json_atomic, TOP_COMBINATIONS_LIMIT};
use occurrence::Occurrence;

#[derive(Debug, Clone, Serialize)]
pub struct TopCombination {
    pub track_name: String,
    pub track_id: String,
    pub class_id: String,
    pub class_name: String,
    pub entry_count: usize,
}

#[derive(Serialize)]
struct TopCombinationsDocument<'a> {
    count: usize,
    results: &'a [TopCombination],
}

/// Aggregate counters produced by a completed build, used to populate
/// `status.json` and for logging.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub combination_count: usize,
    pub unique_track_count: usize,
    pub driver_count: usize,
    pub entry_count: usize,
    pub build_duration: Duration,
}

/// Best-effort resident-memory reading from `/proc/self/status`, used only
/// to log reclaimed bytes around a build; absent on non-Linux platforms.
fn resident_memory_bytes() -> u64 {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| {
            status.lines().find_map(|line| {
                let value = line.strip_prefix("VmRSS:")?;
                let kb: u64 = value.trim().trim_end_matches("kB").trim().parse().ok()?;
                Some(kb * 1024)
            })
        })
        .unwrap_or(0)
}

/// Run [`IndexBuilder::build`] on the blocking thread pool, for callers
/// sitting inside an async context (the periodic indexer, the
/// orchestrator).
pub async fn build_async(
    index_builder: std::sync::Arc<IndexBuilder>,
    working_set: WorkingSet,
    catalog: crate::catalog::Catalog,
) -> anyhow::Result<BuildOutcome> {
    tokio::task::spawn_blocking(move || {
        index_builder.build(&working_set, |class_id| {
            catalog.class_name(class_id).unwrap_or_default().to_string()
        })
    })
    .await
    .map_err(|e| anyhow::anyhow!("index build task panicked: {e}"))?
}

pub struct IndexBuilder {
    out_dir: PathBuf,
    status: StatusStore,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>, status: StatusStore) -> Self {
        Self {
            out_dir: out_dir.into(),
            status,
        }
    }

    #[must_use]
    pub fn driver_index_path(&self) -> PathBuf {
        self.out_dir.join("driver_index.json")
    }

    #[must_use]
    pub fn top_combinations_path(&self) -> PathBuf {
        self.out_dir.join("top_combinations.json")
    }

    /// Class name lookup is injected rather than re-resolved from a catalog
    /// reference, so the builder stays agnostic of where combinations came
    /// from.
    pub fn build(
        &self,
        working_set: &WorkingSet,
        class_name: impl Fn(&str) -> String,
    ) -> anyhow::Result<BuildOutcome> {
        let started = Instant::now();
        let before_bytes = resident_memory_bytes();

        // Pass 1: counts only.
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        let mut unique_tracks: HashSet<&str> = HashSet::new();
        let mut entry_count = 0usize;
        let mut combination_count = 0usize;

        for (key, record) in working_set {
            if record.entries.is_empty() {
                continue;
            }
            combination_count += 1;
            unique_tracks.insert(key.track_id.as_str());
            for raw in &record.entries {
                if let Some(name) = occurrence::driver_name(raw) {
                    if !name.is_empty() {
                        *name_counts.entry(name.to_lowercase()).or_insert(0) += 1;
                        entry_count += 1;
                    }
                }
            }
        }

        // Pass 2: pre-sized buckets, filled in published order.
        let mut buckets: HashMap<String, Vec<Occurrence>> = name_counts
            .iter()
            .map(|(name, &count)| (name.clone(), Vec::with_capacity(count)))
            .collect();
        let mut top_combinations = Vec::with_capacity(combination_count);

        for (key, record) in working_set {
            if record.entries.is_empty() {
                continue;
            }
            let total = record.entries.len();
            for raw in &record.entries {
                if let Some(occ) =
                    occurrence::project(raw, &record.track_name, &key.track_id, &key.class_id, total)
                {
                    buckets
                        .entry(occ.normalized_name.clone())
                        .or_default()
                        .push(occ);
                }
            }
            top_combinations.push(TopCombination {
                track_name: record.track_name.clone(),
                track_id: key.track_id.clone(),
                class_id: key.class_id.clone(),
                class_name: class_name(&key.class_id),
                entry_count: total,
            });
        }

        top_combinations.sort_by(|a, b| b.entry_count.cmp(&a.entry_count));
        top_combinations.truncate(TOP_COMBINATIONS_LIMIT);

        write_json_atomic(&self.driver_index_path(), &buckets)?;
        write_json_atomic(
            &self.top_combinations_path(),
            &TopCombinationsDocument {
                count: top_combinations.len(),
                results: &top_combinations,
            },
        )?;

        let driver_count = buckets.len();
        drop(buckets);
        let after_bytes = resident_memory_bytes();

        let build_duration = started.elapsed();
        self.status.apply_index_metrics(
            combination_count,
            unique_tracks.len(),
            driver_count,
            entry_count,
            build_duration,
            MemoryStats {
                before_bytes,
                after_bytes,
            },
        )?;

        log::info!(
            "index build: {combination_count} combinations, {driver_count} drivers, {entry_count} entries in {:?}",
            build_duration
        );
        tracing::info!(
            combination_count,
            driver_count,
            entry_count,
            duration_ms = build_duration.as_millis() as u64,
            "index build complete"
        );

        Ok(BuildOutcome {
            combination_count,
            unique_track_count: unique_tracks.len(),
            driver_count,
            entry_count,
            build_duration,
        })
    }
}
