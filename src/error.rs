//! Crate-wide error taxonomy.
//!
//! Each component that talks to the outside world (network, disk) defines
//! its own error enum here, following the teacher's `CrawlError` shape: a
//! flat `thiserror` enum, convertible to `anyhow::Error` at the boundary
//! where typed errors meet glue code.

use thiserror::Error;

/// Errors from a single upstream fetch attempt.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {0}")]
    Http(u16),
    #[error("failed to decode upstream response: {0}")]
    Decode(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream fetch cancelled")]
    Cancelled,
}

impl UpstreamError {
    /// Whether the harvester should queue this failure for the retry pass.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::Http(_))
    }
}

/// Errors from the on-disk cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cache decompression error: {0}")]
    Decompress(String),
    #[error("cache entry missing")]
    Missing,
    #[error("cache promote error: {0}")]
    Promote(String),
}

/// Errors from writing index/status artifacts.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("index artifact rename error: {0}")]
    Rename(String),
}

/// Errors from config parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config field: {0}")]
    Invalid(String),
}
