//! Narrow configuration surface: a `{server.port, schedule.*}` JSON
//! document. Unknown keys are ignored; there is deliberately no CLI-flag
//! layer or layered config-file loader here — that belongs to whatever
//! wires this crate into a running service.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::utils::DEFAULT_INDEXING_MINUTES;

#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    schedule: RawSchedule,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawServer {
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawSchedule {
    refresh_hour: Option<u8>,
    refresh_minute: Option<u8>,
    indexing_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub refresh_hour: u8,
    pub refresh_minute: u8,
    pub indexing_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            refresh_hour: 3,
            refresh_minute: 0,
            indexing_minutes: DEFAULT_INDEXING_MINUTES,
        }
    }
}

impl Config {
    /// Parse a config document. Unknown keys are ignored. An
    /// out-of-range `schedule.refresh_hour`/`refresh_minute` is rejected as
    /// invalid (fatal at startup); an out-of-range or non-positive
    /// `schedule.indexing_minutes` silently falls back to the default
    /// (spec.md §9, open question 3) rather than failing startup.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_slice(bytes).map_err(ConfigError::Parse)?;
        let mut config = Self::default();

        if let Some(port) = raw.server.port {
            config.port = port;
        }

        if let Some(hour) = raw.schedule.refresh_hour {
            if hour > 23 {
                return Err(ConfigError::Invalid("schedule.refresh_hour".into()));
            }
            config.refresh_hour = hour;
        }
        if let Some(minute) = raw.schedule.refresh_minute {
            if minute > 59 {
                return Err(ConfigError::Invalid("schedule.refresh_minute".into()));
            }
            config.refresh_minute = minute;
        }
        if let Some(minutes) = raw.schedule.indexing_minutes {
            config.indexing_minutes = if minutes >= 1 {
                minutes as u64
            } else {
                log::warn!("invalid schedule.indexing_minutes={minutes}, falling back to {DEFAULT_INDEXING_MINUTES}");
                DEFAULT_INDEXING_MINUTES
            };
        }

        Ok(config)
    }

    /// Load from disk, defaulting if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_json(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = Config::load(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = br#"{"server":{"port":9090},"unexpected":{"a":1}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.port, 9090);
    }

    #[test]
    fn invalid_indexing_minutes_falls_back_to_default() {
        let json = br#"{"schedule":{"indexing_minutes":0}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.indexing_minutes, DEFAULT_INDEXING_MINUTES);
    }

    #[test]
    fn out_of_range_refresh_hour_is_invalid() {
        let json = br#"{"schedule":{"refresh_hour":24}}"#;
        let err = Config::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = Config::from_json(b"not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
