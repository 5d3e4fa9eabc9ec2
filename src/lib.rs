//! Cache generator and search-index builder for a racing-leaderboard
//! service: harvests a cartesian product of (track, car-class)
//! leaderboards from an upstream HTTP JSON API, persists them to a
//! content-addressed on-disk cache with atomic promotion, and rebuilds a
//! driver-name lookup index plus summary JSON artifacts.

pub mod activity;
pub mod cache;
pub mod cancellation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod flag;
pub mod harvester;
pub mod index;
pub mod orchestrator;
pub mod periodic_indexer;
pub mod scheduler;
pub mod status;
pub mod tracker;
pub mod upstream;
pub mod utils;
pub mod watcher;

pub use catalog::{CarClass, Catalog, CombinationKey, Selector, Track};
pub use config::Config;
pub use orchestrator::Orchestrator;
pub use upstream::UpstreamClient;
