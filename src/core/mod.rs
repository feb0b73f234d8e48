//! Core engine abstractions: jobs, queues, scheduling, dispatch, sub-queues
//! and signals.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod job;
pub mod queue;
pub mod scheduler;
pub mod signal;
pub mod stats;
pub mod sub_queue;

pub use engine::{Lifecycle, WorkerEngine};
pub use error::{AppResult, EngineError, JobError};
pub use job::{FnJob, Job, JobHandle, JobOutcome, PromiseJob};
pub use queue::JobQueue;
pub use scheduler::{CancellationToken, DelayedScheduler, Promotion};
pub use signal::{Connection, Signal};
pub use stats::EngineStats;
pub use sub_queue::SubQueue;
