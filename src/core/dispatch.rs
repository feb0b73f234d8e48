//! Producer-facing submission operations.
//!
//! | Operation | Blocks | Returns |
//! |---|---|---|
//! | [`WorkerEngine::send`] | no | `()` |
//! | [`WorkerEngine::send_delayed`] | no | [`CancellationToken`] |
//! | [`WorkerEngine::send_async`] | no | [`JobHandle`] |
//! | [`WorkerEngine::send_sync`] | yes | the job's value |
//! | [`WorkerEngine::send_wait`] | yes | `()` |
//!
//! Every operation fails with `EngineError::NotAcceptingMessages` once the
//! engine has been stopped. Result-carrying submissions issued from the worker
//! thread itself run in place: queueing them would leave the only consumer
//! blocked waiting on itself.
//!
//! [`SubQueue`](super::SubQueue) offers the same operations through the same
//! submission paths.

use std::time::{Duration, Instant};

use tracing::trace;

use super::engine::{Shared, Target, WorkerEngine};
use super::error::EngineError;
use super::job::{FnJob, Job, JobHandle, PromiseJob};
use super::scheduler::CancellationToken;
use super::stats::EngineCounters;
use super::Lifecycle;

/// Fallback horizon for delays too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

impl Shared {
    pub(crate) fn submit(&self, target: Target, job: Box<dyn Job>) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let lane = state.lane_mut(target)?;
        lane.queue.enqueue(job);
        let queued = lane.queue.len();
        EngineCounters::add(&self.counters.submitted, 1);
        self.wake.notify_one();
        trace!(engine = %self.name, target = ?target, queued = queued, "Job enqueued");
        Ok(())
    }

    pub(crate) fn submit_delayed(
        &self,
        target: Target,
        job: Box<dyn Job>,
        delay: Duration,
    ) -> Result<CancellationToken, EngineError> {
        let mut state = self.state.lock();
        let lane = state.lane_mut(target)?;
        let now = Instant::now();
        let wake_at = now
            .checked_add(delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let token = lane.scheduler.schedule(job, wake_at);
        let scheduled = lane.scheduler.len();
        EngineCounters::add(&self.counters.delayed, 1);
        self.wake.notify_one();
        trace!(
            engine = %self.name,
            target = ?target,
            delay = ?delay,
            scheduled = scheduled,
            "Delayed job scheduled"
        );
        Ok(token)
    }

    pub(crate) fn submit_async<F, R>(
        &self,
        target: Target,
        job: F,
    ) -> Result<JobHandle<R>, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job, handle) = PromiseJob::new(job);
        let job: Box<dyn Job> = Box::new(job);
        let mut state = self.state.lock();
        let in_place = state.is_worker();
        let lane = state.lane_mut(target)?;
        EngineCounters::add(&self.counters.submitted, 1);
        if in_place {
            drop(state);
            trace!(engine = %self.name, target = ?target, "Reentrant job executed in place");
            self.execute(job);
        } else {
            lane.queue.enqueue(job);
            self.wake.notify_one();
        }
        Ok(handle)
    }

    /// Preconditions of a blocking submission, checked before anything is
    /// queued.
    pub(crate) fn check_blocking(&self, target: Target) -> Result<(), EngineError> {
        let state = self.state.lock();
        if !state.accepts(target) {
            return Err(EngineError::NotAcceptingMessages);
        }
        if state.lifecycle == Lifecycle::NotStarted {
            return Err(EngineError::NotStarted);
        }
        Ok(())
    }
}

impl WorkerEngine {
    /// Submit a fire-and-forget job.
    ///
    /// A panic inside `job` is contained and discarded.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` if the engine has been stopped.
    pub fn send<F>(&self, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_job(Box::new(FnJob::new(job)))
    }

    /// Submit a custom [`Job`] implementation for immediate execution.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` if the engine has been stopped.
    pub fn send_job(&self, job: Box<dyn Job>) -> Result<(), EngineError> {
        self.shared().submit(Target::Main, job)
    }

    /// Submit a fire-and-forget job to run once `delay` has elapsed.
    ///
    /// The delay is measured on the monotonic clock. The returned token can
    /// withdraw the job until it becomes due.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` if the engine has been stopped.
    pub fn send_delayed<F>(&self, job: F, delay: Duration) -> Result<CancellationToken, EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_job_delayed(Box::new(FnJob::new(job)), delay)
    }

    /// Submit a custom [`Job`] implementation to run once `delay` has elapsed.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` if the engine has been stopped.
    pub fn send_job_delayed(
        &self,
        job: Box<dyn Job>,
        delay: Duration,
    ) -> Result<CancellationToken, EngineError> {
        self.shared().submit_delayed(Target::Main, job, delay)
    }

    /// Submit a job and return a handle to its result without blocking.
    ///
    /// Called from the worker thread, the job runs immediately and the handle
    /// is already resolved when this returns.
    ///
    /// # Errors
    ///
    /// `EngineError::NotAcceptingMessages` if the engine has been stopped.
    pub fn send_async<F, R>(&self, job: F) -> Result<JobHandle<R>, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared().submit_async(Target::Main, job)
    }

    /// Submit a job and block until its result is available.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotAcceptingMessages` if the engine has been stopped
    /// - `EngineError::NotStarted` if the engine was never started; the wait
    ///   could otherwise never finish
    /// - `EngineError::Job` if the job panicked or was discarded
    pub fn send_sync<F, R>(&self, job: F) -> Result<R, EngineError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.shared().check_blocking(Target::Main)?;
        let handle = self.send_async(job)?;
        Ok(handle.wait()?)
    }

    /// Submit a job and block until it has run.
    ///
    /// # Errors
    ///
    /// Same as [`WorkerEngine::send_sync`].
    pub fn send_wait<F>(&self, job: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send_sync(job)
    }
}
