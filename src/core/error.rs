//! Error types for engine and job operations.

use thiserror::Error;

/// Errors produced by the engine's lifecycle and dispatch operations.
///
/// These are precondition violations reported synchronously to the caller;
/// they are never queued or retried.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `start()` or `run()` was called on an engine that was already started.
    #[error("engine already started")]
    AlreadyStarted,
    /// The operation needs a started engine (`stop()`, `send_sync()`, `send_wait()`).
    #[error("engine not started")]
    NotStarted,
    /// The engine has been stopped (or cancelled) and rejects new jobs.
    #[error("engine is not accepting messages")]
    NotAcceptingMessages,
    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    /// The worker thread terminated by panicking outside of a job.
    #[error("worker thread panicked")]
    WorkerPanicked,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A result-carrying job failed; the failure is transported to the caller.
    #[error("job failed: {0}")]
    Job(#[from] JobError),
}

/// Failures observed through a job's result channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The job body panicked; carries the panic message when one was available.
    #[error("job panicked: {0}")]
    Panicked(String),
    /// The job was dropped before it produced a result.
    #[error("job was dropped before it produced a result")]
    Abandoned,
    /// The caller stopped waiting before the result was published.
    #[error("timed out waiting for job result")]
    Timeout,
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
