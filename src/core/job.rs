//! Units of work and their result channels.
//!
//! A job is anything that can be executed exactly once on the engine's worker.
//! Two shapes are provided:
//!
//! - [`FnJob`] wraps a fire-and-forget closure. A panic inside the closure is
//!   caught and discarded so a faulty producer cannot take the worker down.
//! - [`PromiseJob`] wraps a closure returning a value and owns the sending half
//!   of a one-shot channel. The value, or the captured panic, is published to
//!   the matching [`JobHandle`].

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
#[cfg(feature = "tokio-runtime")]
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Select, Sender, TryRecvError};
use tracing::warn;

use super::error::JobError;

/// How a job's execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The callable returned normally.
    Completed,
    /// The callable panicked; the panic was contained.
    Panicked,
}

/// A unit of work executed once by the engine.
///
/// Implementors must contain failures of the wrapped work: `execute` is called
/// on the worker thread and must not unwind.
pub trait Job: Send {
    /// Run the job, consuming it.
    fn execute(self: Box<Self>) -> JobOutcome;
}

/// Fire-and-forget job wrapping a closure.
pub struct FnJob<F> {
    callable: F,
}

impl<F> FnJob<F>
where
    F: FnOnce() + Send,
{
    /// Wrap a closure.
    pub const fn new(callable: F) -> Self {
        Self { callable }
    }
}

impl<F> Job for FnJob<F>
where
    F: FnOnce() + Send,
{
    fn execute(self: Box<Self>) -> JobOutcome {
        let Self { callable } = *self;
        match catch_unwind(AssertUnwindSafe(callable)) {
            Ok(()) => JobOutcome::Completed,
            Err(payload) => {
                // Nobody is listening for this job's outcome.
                warn!(panic = %panic_message(payload.as_ref()), "Fire-and-forget job panicked");
                JobOutcome::Panicked
            }
        }
    }
}

/// Result-carrying job: publishes the closure's value or failure exactly once.
pub struct PromiseJob<F, R> {
    callable: F,
    promise: Sender<Result<R, JobError>>,
}

impl<F, R> PromiseJob<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    /// Wrap a closure and create the handle its result will be published to.
    pub fn new(callable: F) -> (Self, JobHandle<R>) {
        let (promise, receiver) = bounded(1);
        (Self { callable, promise }, JobHandle { receiver })
    }
}

impl<F, R> Job for PromiseJob<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    fn execute(self: Box<Self>) -> JobOutcome {
        let Self { callable, promise } = *self;
        let (result, outcome) = match catch_unwind(AssertUnwindSafe(callable)) {
            Ok(value) => (Ok(value), JobOutcome::Completed),
            Err(payload) => (
                Err(JobError::Panicked(panic_message(payload.as_ref()))),
                JobOutcome::Panicked,
            ),
        };
        // The handle may already be dropped; the result is then discarded.
        let _ = promise.try_send(result);
        outcome
    }
}

/// Receiving side of a [`PromiseJob`].
///
/// The result is handed out once. After it has been taken, further polls
/// report [`JobError::Abandoned`].
#[derive(Debug)]
pub struct JobHandle<R> {
    receiver: Receiver<Result<R, JobError>>,
}

impl<R> JobHandle<R> {
    /// Block until the job's result is published.
    ///
    /// # Errors
    ///
    /// - `JobError::Panicked` if the job body panicked
    /// - `JobError::Abandoned` if the job was dropped without running
    pub fn wait(self) -> Result<R, JobError> {
        self.receiver.recv().unwrap_or(Err(JobError::Abandoned))
    }

    /// Block until the result is published or `timeout` elapses.
    ///
    /// On timeout the handle stays valid and can be waited on again.
    ///
    /// # Errors
    ///
    /// - `JobError::Timeout` if nothing was published in time
    /// - `JobError::Panicked` / `JobError::Abandoned` as for [`JobHandle::wait`]
    pub fn wait_timeout(&self, timeout: Duration) -> Result<R, JobError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(JobError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(JobError::Abandoned),
        }
    }

    /// Take the result if it is already available, without blocking.
    pub fn try_take(&self) -> Option<Result<R, JobError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(JobError::Abandoned)),
        }
    }

    /// Whether [`JobHandle::wait`] would return without blocking: a result is
    /// waiting, or the job was dropped and the handle reports `Abandoned`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let mut select = Select::new();
        select.recv(&self.receiver);
        select.try_ready().is_ok()
    }
}

/// Longest single blocking receive behind an async wait. Bounds how long a
/// dropped future keeps a blocking-pool thread busy.
#[cfg(feature = "tokio-runtime")]
const ASYNC_WAIT_SLICE: Duration = Duration::from_millis(50);

#[cfg(feature = "tokio-runtime")]
impl<R> JobHandle<R>
where
    R: Send + 'static,
{
    /// Await the job's result from an async context.
    ///
    /// The receive runs on tokio's blocking pool in short slices, so the async
    /// runtime is never stalled and dropping the future releases the pool
    /// thread promptly.
    ///
    /// # Errors
    ///
    /// Same as [`JobHandle::wait`].
    pub async fn wait_async(self) -> Result<R, JobError> {
        self.wait_async_until(None).await
    }

    /// Await the job's result, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// `JobError::Timeout` on expiry, otherwise as for [`JobHandle::wait`].
    pub async fn wait_async_timeout(self, timeout: Duration) -> Result<R, JobError> {
        let deadline = Instant::now().checked_add(timeout);
        self.wait_async_until(deadline).await
    }

    async fn wait_async_until(mut self, deadline: Option<Instant>) -> Result<R, JobError> {
        loop {
            if let Some(result) = self.try_take() {
                return result;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(JobError::Timeout);
                    }
                    remaining.min(ASYNC_WAIT_SLICE)
                }
                None => ASYNC_WAIT_SLICE,
            };
            let (handle, result) = tokio::task::spawn_blocking(move || {
                let result = self.wait_timeout(slice);
                (self, result)
            })
            .await
            .map_err(|_| JobError::Abandoned)?;
            match result {
                Err(JobError::Timeout) => self = handle,
                other => return other,
            }
        }
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
