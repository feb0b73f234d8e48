//! Time-ordered scheduler for delayed jobs and their cancellation tokens.
//!
//! The scheduler is the only strong owner of each entry's cancel flag. A
//! [`CancellationToken`] observes the flag through a `Weak`, so once an entry
//! leaves the scheduler (promoted, reclaimed after cancellation, or discarded at
//! shutdown) the token can no longer reach it and reports it as executed.
//!
//! Cancellation is best-effort: a `cancel()` racing with promotion may lose, in
//! which case the job still runs. [`CancellationToken::is_executed`] lets callers
//! observe which way the race went.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use super::job::Job;
use super::queue::JobQueue;

/// A delayed job waiting for its wake time.
struct ScheduledEntry {
    job: Box<dyn Job>,
    cancelled: Arc<AtomicBool>,
}

/// Result of a promotion pass.
#[derive(Default)]
pub struct Promotion {
    /// Number of due entries moved to the FIFO queue.
    pub promoted: usize,
    /// Due jobs withdrawn because they were cancelled. The caller decides
    /// where to drop them.
    pub reclaimed: Vec<Box<dyn Job>>,
}

impl fmt::Debug for Promotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promotion")
            .field("promoted", &self.promoted)
            .field("reclaimed", &self.reclaimed.len())
            .finish()
    }
}

/// Time-ordered multiset of not-yet-due jobs.
///
/// Entries are keyed by `(wake_at, sequence)` so equal wake times keep their
/// insertion order.
#[derive(Default)]
pub struct DelayedScheduler {
    entries: BTreeMap<(Instant, u64), ScheduledEntry>,
    next_sequence: u64,
}

impl DelayedScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job to become due at `wake_at`. O(log n).
    pub fn schedule(&mut self, job: Box<dyn Job>, wake_at: Instant) -> CancellationToken {
        let cancelled = Arc::new(AtomicBool::new(false));
        let token = CancellationToken {
            flag: Arc::downgrade(&cancelled),
        };
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.entries
            .insert((wake_at, sequence), ScheduledEntry { job, cancelled });
        token
    }

    /// Move every entry due at `now` into `queue`, earliest first.
    ///
    /// Cancelled entries are handed back in [`Promotion::reclaimed`] without
    /// being executed. Scanning stops at the first entry that is not yet due,
    /// so the cost is bounded by the number of due entries.
    pub fn promote_due(&mut self, now: Instant, queue: &mut JobQueue) -> Promotion {
        let mut promotion = Promotion::default();
        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ScheduledEntry { job, cancelled } = entry.remove();
            if cancelled.load(Ordering::Acquire) {
                promotion.reclaimed.push(job);
            } else {
                queue.enqueue(job);
                promotion.promoted += 1;
            }
        }
        promotion
    }

    /// Wake time of the earliest pending entry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(wake_at, _)| *wake_at)
    }

    /// Number of pending entries, cancelled ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DelayedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedScheduler")
            .field("len", &self.len())
            .field("next_deadline", &self.next_deadline())
            .finish()
    }
}

/// Non-owning handle to a delayed job.
///
/// A default token refers to nothing and reports itself as executed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Weak<AtomicBool>,
}

impl CancellationToken {
    /// Withdraw the job if it has not left the scheduler yet.
    ///
    /// Idempotent. Has no effect once the job was promoted.
    pub fn cancel(&self) {
        if let Some(flag) = self.flag.upgrade() {
            flag.store(true, Ordering::Release);
        }
    }

    /// Whether the job is no longer pending in the scheduler.
    ///
    /// This means "promoted or reclaimed", not a guarantee that the job body
    /// ran.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.flag.strong_count() == 0
    }

    /// Whether the job is still pending and has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag
            .upgrade()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}
