//! FIFO queue of jobs ready for immediate execution.

use std::collections::VecDeque;
use std::fmt;

use super::job::Job;

/// Ordered pending jobs awaiting the worker.
///
/// Global insertion order across all producers is preserved: the queue lives
/// behind the engine lock, so every `enqueue` is totally ordered.
#[derive(Default)]
pub struct JobQueue {
    jobs: VecDeque<Box<dyn Job>>,
}

impl JobQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job at the tail. O(1).
    pub fn enqueue(&mut self, job: Box<dyn Job>) {
        self.jobs.push_back(job);
    }

    /// Move every job of `other` to the tail, keeping their order.
    pub fn append(&mut self, other: &mut Self) {
        self.jobs.append(&mut other.jobs);
    }

    /// Remove the oldest job.
    pub fn dequeue(&mut self) -> Option<Box<dyn Job>> {
        self.jobs.pop_front()
    }

    /// Remove every job, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Box<dyn Job>> + '_ {
        self.jobs.drain(..)
    }

    /// Number of pending jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue").field("len", &self.len()).finish()
    }
}
