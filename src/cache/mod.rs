//! Cache Store: on-disk persistence for harvested leaderboard combinations.

pub mod compression;
pub mod record;
pub mod store;

pub use record::{CombinationRecord, RawEntry};
pub use store::{CacheRoot, Store};

/// The in-memory best-known snapshot of combinations held during a refresh,
/// in canonical catalog iteration order (tracks outer, classes inner).
pub type WorkingSet = Vec<(crate::catalog::CombinationKey, CombinationRecord)>;
