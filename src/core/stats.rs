//! Engine statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Jobs accepted for immediate execution (including reentrant ones).
    pub submitted: u64,
    /// Jobs accepted for delayed execution.
    pub delayed: u64,
    /// Jobs that ran to completion.
    pub executed: u64,
    /// Jobs whose body panicked.
    pub failed: u64,
    /// Cancelled delayed jobs dropped at their wake time.
    pub reclaimed: u64,
    /// Jobs dropped unexecuted by `cancel_all` or shutdown.
    pub discarded: u64,
    /// Jobs currently in the FIFO queue.
    pub queued: usize,
    /// Jobs currently waiting in the delayed scheduler.
    pub scheduled: usize,
}

/// Internal counters for engine statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub submitted: AtomicU64,
    pub delayed: AtomicU64,
    pub executed: AtomicU64,
    pub failed: AtomicU64,
    pub reclaimed: AtomicU64,
    pub discarded: AtomicU64,
}

impl EngineCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, queued: usize, scheduled: usize) -> EngineStats {
        EngineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            queued,
            scheduled,
        }
    }

    pub fn add(counter: &AtomicU64, amount: usize) {
        counter.fetch_add(amount as u64, Ordering::Relaxed);
    }
}
