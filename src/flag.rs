//! A cheaply cloneable, shared boolean — used for the orchestrator's
//! in-progress guard, which several background loops (periodic indexer,
//! watcher) need to read without taking the published-snapshot lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AtomicFlag(Arc<AtomicBool>);

impl AtomicFlag {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self(Arc::new(AtomicBool::new(initial)))
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}
