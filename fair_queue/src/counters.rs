use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cheaply-clonable, lock-free dispatch counters for one [`crate::FairQueue`].
///
/// Mirrors `backend::metrics::counters::Counters`: a handful of
/// `Arc<AtomicU64>` fields so a metrics exporter can hold a clone and read it
/// from another thread without ever touching the queue itself.
#[derive(Clone, Debug, Default)]
pub struct FairQueueCounters {
    pub dispatched_total: Arc<AtomicU64>,
    pub cancelled_total: Arc<AtomicU64>,
    pub capacity_denied_total: Arc<AtomicU64>,
    pub runaway_resets_total: Arc<AtomicU64>,
}

impl FairQueueCounters {
    pub fn dispatched_total(&self) -> u64 {
        self.dispatched_total.load(Ordering::Relaxed)
    }

    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total.load(Ordering::Relaxed)
    }

    pub fn capacity_denied_total(&self) -> u64 {
        self.capacity_denied_total.load(Ordering::Relaxed)
    }

    pub fn runaway_resets_total(&self) -> u64 {
        self.runaway_resets_total.load(Ordering::Relaxed)
    }
}
