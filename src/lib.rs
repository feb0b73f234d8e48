//! # Serial Task Queue
//!
//! A single-consumer job engine: any number of producer threads hand work to
//! one dedicated worker that executes it strictly one job at a time.
//!
//! Confining mutable state to one thread removes the need to lock it. Instead
//! of sharing data across threads, callers submit closures that run on the
//! thread owning the data.
//!
//! ## Key Features
//!
//! - **Fire-and-forget**: `send` enqueues and returns immediately
//! - **Delayed jobs**: `send_delayed` runs a job after a monotonic delay and
//!   returns a cancellation token
//! - **Result-carrying jobs**: `send_async` returns a [`core::JobHandle`];
//!   `send_sync` blocks until the job's value is available
//! - **Reentrancy**: blocking submissions issued from the worker itself run in
//!   place instead of deadlocking
//! - **Graceful stop**: stopping drains the already-queued jobs
//! - **Sub-queues**: [`core::SubQueue`] shares an engine's worker but can be
//!   cancelled on its own
//! - **Signals**: broadcast values to listeners on their own engines
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use serial_task_queue::builders::EngineBuilder;
//!
//! let engine = EngineBuilder::new().name("io-loop").build()?;
//! engine.start()?;
//!
//! engine.send(|| println!("runs on io-loop"))?;
//! let token = engine.send_delayed(|| println!("later"), Duration::from_secs(60))?;
//! token.cancel();
//!
//! let sum = engine.send_sync(|| (1..=10).sum::<u32>())?;
//! assert_eq!(sum, 55);
//!
//! engine.stop()?;
//! engine.join()?;
//! # Ok::<(), serial_task_queue::core::EngineError>(())
//! ```
//!
//! With the `tokio-runtime` feature (on by default), result handles can also be
//! awaited from async code via [`core::JobHandle::wait_async`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Jobs, queues, the worker engine and signals.
pub mod core;
/// Configuration models for engines and engine registries.
pub mod config;
/// Builders to construct engines from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
