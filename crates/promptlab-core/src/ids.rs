//! Instance id allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<InstanceIdAllocator> = OnceLock::new();

/// Monotonic id counter. Clones share the same counter, so ids handed out by
/// any clone are never handed out again by another.
#[derive(Debug, Clone)]
pub struct InstanceIdAllocator {
    next: Arc<AtomicU64>,
}

impl InstanceIdAllocator {
    /// The process-wide allocator used by stores that don't inject their own.
    pub fn global() -> Self {
        GLOBAL.get_or_init(|| Self::starting_at(0)).clone()
    }

    /// A fresh allocator whose first id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Make sure every id up to and including `id` is treated as taken.
    pub fn reserve_through(&self, id: u64) {
        self.next.fetch_max(id.saturating_add(1), Ordering::Relaxed);
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for InstanceIdAllocator {
    fn default() -> Self {
        Self::global()
    }
}
