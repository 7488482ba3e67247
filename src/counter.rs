use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared source of monotonically increasing IDs.
///
/// The parser draws from one of these to mint a distinct name for every
/// wildcard occurrence, so two `_`s in the same structure never alias.
#[derive(Clone, Debug)]
pub struct Counter {
    next: Arc<AtomicU64>,
}

impl Default for Counter {
    fn default() -> Self {
        Self {
            next: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Counter {
    /// Create a new counter starting at `start`. Seeding makes the names
    /// produced by a parse deterministic in tests.
    pub fn with_start(start: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Return the next ID.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}
