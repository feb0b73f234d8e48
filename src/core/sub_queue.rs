//! Sub-queues: independently cancellable job queues served by a parent
//! engine's worker.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::engine::{Lane, Shared, Target};
use super::error::EngineError;
use super::job::{FnJob, Job, JobHandle};
use super::scheduler::CancellationToken;
use super::stats::EngineCounters;

/// A job queue that runs on its parent engine's worker thread.
///
/// Jobs sent through a sub-queue keep their FIFO order relative to each other
/// and are picked up behind the parent's pending jobs. [`SubQueue::cancel_all`]
/// only discards this sub-queue's work, while the parent's
/// [`WorkerEngine::cancel_all`](super::WorkerEngine::cancel_all) and stop
/// reach every sub-queue.
///
/// Dropping the handle discards whatever it still has pending.
///
/// ```rust
/// use serial_task_queue::core::WorkerEngine;
///
/// let engine = WorkerEngine::default();
/// engine.start()?;
/// let downloads = engine.create_sub_queue();
///
/// downloads.send(|| println!("queued on the engine's worker"))?;
/// downloads.cancel_all();
/// assert!(engine.send_sync(|| true)?);
///
/// engine.stop()?;
/// engine.join()?;
/// # Ok::<(), serial_task_queue::core::EngineError>(())
/// ```
#[derive(Debug)]
pub struct SubQueue {
    shared: Arc<Shared>,
    id: u64,
}

impl SubQueue {
    pub(crate) fn new(shared: Arc<Shared>, id: u64) -> Self {
        Self { shared, id }
    }

    fn target(&self) -> Target {
        Target::Sub(self.id)
    }

    /// Submit a fire-and-forget job.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` once this sub-queue or its parent
    /// was cancelled or stopped.
    pub fn send<F>(&self, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_job(Box::new(FnJob::new(job)))
    }

    /// Submit a custom [`Job`] implementation.
    ///
    /// # Errors
    ///
    /// Same as [`SubQueue::send`].
    pub fn send_job(&self, job: Box<dyn Job>) -> Result<(), EngineError> {
        self.shared.submit(self.target(), job)
    }

    /// Submit a fire-and-forget job to run once `delay` has elapsed.
    ///
    /// # Errors
    ///
    /// Same as [`SubQueue::send`].
    pub fn send_delayed<F>(&self, job: F, delay: Duration) -> Result<CancellationToken, EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared
            .submit_delayed(self.target(), Box::new(FnJob::new(job)), delay)
    }

    /// Submit a job and return a handle to its result without blocking.
    ///
    /// # Errors
    ///
    /// Same as [`SubQueue::send`].
    pub fn send_async<F, R>(&self, job: F) -> Result<JobHandle<R>, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared.submit_async(self.target(), job)
    }

    /// Submit a job and block until its result is available.
    ///
    /// # Errors
    ///
    /// As for [`WorkerEngine::send_sync`](super::WorkerEngine::send_sync).
    pub fn send_sync<F, R>(&self, job: F) -> Result<R, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared.check_blocking(self.target())?;
        let handle = self.send_async(job)?;
        Ok(handle.wait()?)
    }

    /// Submit a job and block until it has run.
    ///
    /// # Errors
    ///
    /// As for [`WorkerEngine::send_sync`](super::WorkerEngine::send_sync).
    pub fn send_wait<F>(&self, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_sync(job)
    }

    /// Discard this sub-queue's pending jobs and reject new ones.
    ///
    /// The parent engine and its other sub-queues are unaffected. Returns the
    /// number of jobs discarded.
    pub fn cancel_all(&self) -> usize {
        let lane = {
            let mut state = self.shared.state.lock();
            state.sub_queues.get_mut(&self.id).map(Lane::cancel)
        };
        let discarded = lane.as_ref().map_or(0, Lane::len);
        drop(lane);
        EngineCounters::add(&self.shared.counters.discarded, discarded);
        debug!(
            engine = %self.shared.name,
            sub_queue = self.id,
            discarded = discarded,
            "Sub-queue cancelled"
        );
        discarded
    }

    /// Whether this sub-queue currently accepts jobs.
    #[must_use]
    pub fn accepts_jobs(&self) -> bool {
        self.shared.state.lock().accepts(self.target())
    }

    /// Whether the calling thread is the worker serving this sub-queue.
    #[must_use]
    pub fn is_worker_thread(&self) -> bool {
        self.shared.state.lock().is_worker()
    }

    /// Jobs waiting in this sub-queue, immediate and delayed.
    ///
    /// Immediate jobs move to the parent's queue as soon as the worker picks
    /// them up, after which they are no longer counted here.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared
            .state
            .lock()
            .sub_queues
            .get(&self.id)
            .map_or(0, Lane::len)
    }
}

impl Drop for SubQueue {
    fn drop(&mut self) {
        let lane = self.shared.state.lock().sub_queues.remove(&self.id);
        if let Some(lane) = lane {
            EngineCounters::add(&self.shared.counters.discarded, lane.len());
            drop(lane);
        }
    }
}
