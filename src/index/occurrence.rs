//! Projection of one raw leaderboard entry into an indexable occurrence.
//!
//! Field extraction is null-tolerant throughout: any optional field missing
//! from the raw upstream object becomes the empty string or zero, rather
//! than failing the whole entry.

use serde::{Deserialize, Serialize};

use crate::cache::RawEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub name: String,
    pub normalized_name: String,
    pub position: u32,
    pub laptime: String,
    pub time_diff_to_leader: f64,
    pub country: String,
    pub car: String,
    pub car_class: String,
    pub team: String,
    pub rank: String,
    pub difficulty: String,
    pub track_name: String,
    pub track_id: String,
    pub class_id: String,
    pub total_entries: usize,
}

fn str_field(entry: &RawEntry, key: &str) -> String {
    entry
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Parse a relative-laptime string of the form `"+N.Ns"` into seconds.
/// `"+0.000s"` parses to `0.0`; anything unparseable also yields `0.0`.
fn parse_relative_laptime(raw: &str) -> f64 {
    raw.trim()
        .trim_start_matches('+')
        .trim_end_matches('s')
        .parse()
        .unwrap_or(0.0)
}

/// Read `driver.name` without projecting the rest of the entry; used by
/// the counting pass.
#[must_use]
pub fn driver_name(entry: &RawEntry) -> Option<&str> {
    entry.get("driver")?.get("name")?.as_str()
}

/// Project one raw entry into an [`Occurrence`]. Returns `None` when
/// `driver.name` is missing or empty, per spec.md §4.6 ("skip entries
/// missing driver.name").
#[must_use]
pub fn project(
    entry: &RawEntry,
    track_name: &str,
    track_id: &str,
    class_id: &str,
    total_entries: usize,
) -> Option<Occurrence> {
    let name = driver_name(entry)?;
    if name.is_empty() {
        return None;
    }

    let position = entry
        .get("index")
        .and_then(serde_json::Value::as_u64)
        .map_or(1, |i| i as u32 + 1);

    let time_diff_to_leader = entry
        .get("relative_laptime")
        .and_then(|v| v.as_str())
        .map(parse_relative_laptime)
        .unwrap_or(0.0);

    let country = entry
        .get("country")
        .and_then(|c| c.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let car = entry
        .get("car_class")
        .and_then(|c| c.get("car"))
        .and_then(|c| c.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let car_class = entry
        .get("car_class")
        .and_then(|c| c.get("car"))
        .and_then(|c| c.get("class-name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Some(Occurrence {
        normalized_name: name.to_lowercase(),
        name: name.to_string(),
        position,
        laptime: str_field(entry, "laptime"),
        time_diff_to_leader,
        country,
        car,
        car_class,
        team: str_field(entry, "team"),
        rank: str_field(entry, "rank"),
        difficulty: str_field(entry, "driving_model"),
        track_name: track_name.to_string(),
        track_id: track_id.to_string(),
        class_id: class_id.to_string(),
        total_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(json: serde_json::Value) -> RawEntry {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn projects_full_entry() {
        let e = entry_with(serde_json::json!({
            "driver": {"name": "Ludo Flender"},
            "index": 0,
            "laptime": "1:23.456",
            "relative_laptime": "+0.000s",
            "country": {"name": "Belgium"},
            "team": "Some Team",
            "rank": "Pro",
            "driving_model": "Assists Off",
            "car_class": {"car": {"name": "GT3 Car", "class-name": "GT3"}}
        }));
        let occ = project(&e, "Nordschleife", "1693", "8600", 42).unwrap();
        assert_eq!(occ.name, "Ludo Flender");
        assert_eq!(occ.normalized_name, "ludo flender");
        assert_eq!(occ.position, 1);
        assert_eq!(occ.time_diff_to_leader, 0.0);
        assert_eq!(occ.country, "Belgium");
        assert_eq!(occ.car, "GT3 Car");
        assert_eq!(occ.car_class, "GT3");
        assert_eq!(occ.total_entries, 42);
    }

    #[test]
    fn missing_driver_name_is_skipped() {
        let e = entry_with(serde_json::json!({"laptime": "1:00.000"}));
        assert!(project(&e, "T", "1", "2", 1).is_none());
    }

    #[test]
    fn missing_optional_fields_default_empty() {
        let e = entry_with(serde_json::json!({"driver": {"name": "Solo Driver"}}));
        let occ = project(&e, "T", "1", "2", 1).unwrap();
        assert_eq!(occ.country, "");
        assert_eq!(occ.team, "");
        assert_eq!(occ.position, 1);
        assert_eq!(occ.time_diff_to_leader, 0.0);
    }

    #[test]
    fn relative_laptime_parses_plus_prefixed_seconds() {
        let e = entry_with(serde_json::json!({
            "driver": {"name": "A"},
            "relative_laptime": "+1.250s"
        }));
        let occ = project(&e, "T", "1", "2", 1).unwrap();
        assert!((occ.time_diff_to_leader - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn case_differing_names_normalize_to_same_bucket() {
        let a = entry_with(serde_json::json!({"driver": {"name": "Ludo Flender"}}));
        let b = entry_with(serde_json::json!({"driver": {"name": "LUDO FLENDER"}}));
        assert_eq!(
            project(&a, "T", "1", "2", 1).unwrap().normalized_name,
            project(&b, "T", "1", "2", 1).unwrap().normalized_name
        );
    }
}
