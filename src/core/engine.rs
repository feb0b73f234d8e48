//! Worker engine: the single-consumer event loop and its lifecycle.
//!
//! The engine owns a FIFO queue and a delayed scheduler behind one
//! `parking_lot::Mutex`, paired with one `Condvar` that signals both "work
//! arrived" and "stop requested". Jobs always execute outside the lock, so
//! producers are never blocked by a slow job body.
//!
//! Two ways to drive the loop share the same logic:
//!
//! - [`WorkerEngine::start`] spawns a dedicated, named OS thread.
//! - [`WorkerEngine::run`] turns the calling thread into the worker and blocks
//!   until the engine is stopped.
//!
//! # Lifecycle
//!
//! `NotStarted → Running → Stopped`. The transition to `Stopped` is terminal: a
//! stopped engine cannot be restarted. Stopping also stops the engine from
//! accepting jobs; whatever is already in the FIFO queue is drained and
//! executed once more before the loop exits, while delayed jobs that are not
//! yet due are discarded.
//!
//! Sub-queues are extra lanes in the same locked state. The loop folds their
//! due and queued jobs into its own queue, so one worker serves them all.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;

use super::error::EngineError;
use super::job::{Job, JobOutcome};
use super::queue::JobQueue;
use super::scheduler::{DelayedScheduler, Promotion};
use super::stats::{EngineCounters, EngineStats};
use super::sub_queue::SubQueue;

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created; jobs may be queued but nothing runs yet.
    NotStarted,
    /// The event loop is running (or about to run) on the worker.
    Running,
    /// Stop was requested. Terminal.
    Stopped,
}

/// Pending work of one submission target.
#[derive(Debug)]
pub(crate) struct Lane {
    pub(crate) queue: JobQueue,
    pub(crate) scheduler: DelayedScheduler,
    /// Cleared by stop or `cancel_all`; never set back.
    pub(crate) accepting: bool,
}

impl Lane {
    pub(crate) fn new(accepting: bool) -> Self {
        Self {
            queue: JobQueue::new(),
            scheduler: DelayedScheduler::new(),
            accepting,
        }
    }

    /// Move all pending work out, keeping the accepting flag.
    fn take(&mut self) -> Self {
        let accepting = self.accepting;
        std::mem::replace(self, Self::new(accepting))
    }

    /// Reject new jobs and move pending work out.
    pub(crate) fn cancel(&mut self) -> Self {
        self.accepting = false;
        self.take()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len() + self.scheduler.len()
    }
}

/// Where a submission goes: the engine itself or one of its sub-queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Main,
    Sub(u64),
}

/// State guarded by the engine lock.
#[derive(Debug)]
pub(crate) struct EngineState {
    /// The engine's own lane. Its flag gates every lane.
    pub(crate) main: Lane,
    pub(crate) sub_queues: BTreeMap<u64, Lane>,
    next_sub_queue: u64,
    pub(crate) lifecycle: Lifecycle,
    /// Thread currently running the event loop.
    pub(crate) worker: Option<ThreadId>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            main: Lane::new(true),
            sub_queues: BTreeMap::new(),
            next_sub_queue: 0,
            lifecycle: Lifecycle::NotStarted,
            worker: None,
        }
    }

    pub(crate) fn accepts(&self, target: Target) -> bool {
        self.main.accepting
            && match target {
                Target::Main => true,
                Target::Sub(id) => self.sub_queues.get(&id).is_some_and(|lane| lane.accepting),
            }
    }

    /// The lane `target` submits to, if it currently accepts jobs.
    pub(crate) fn lane_mut(&mut self, target: Target) -> Result<&mut Lane, EngineError> {
        if !self.accepts(target) {
            return Err(EngineError::NotAcceptingMessages);
        }
        match target {
            Target::Main => Ok(&mut self.main),
            Target::Sub(id) => self
                .sub_queues
                .get_mut(&id)
                .ok_or(EngineError::NotAcceptingMessages),
        }
    }

    /// Promote due delayed jobs of every lane, then move sub-queue jobs
    /// behind the engine's own pending jobs.
    fn promote_due(&mut self, now: Instant) -> Promotion {
        let mut promotion = self.main.scheduler.promote_due(now, &mut self.main.queue);
        for lane in self.sub_queues.values_mut() {
            let sub = lane.scheduler.promote_due(now, &mut lane.queue);
            promotion.promoted += sub.promoted;
            promotion.reclaimed.extend(sub.reclaimed);
        }
        self.gather_sub_queues();
        promotion
    }

    fn gather_sub_queues(&mut self) {
        for lane in self.sub_queues.values_mut() {
            self.main.queue.append(&mut lane.queue);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        std::iter::once(&self.main)
            .chain(self.sub_queues.values())
            .filter_map(|lane| lane.scheduler.next_deadline())
            .min()
    }

    fn queued(&self) -> usize {
        self.main.queue.len() + self.sub_queues.values().map(|l| l.queue.len()).sum::<usize>()
    }

    fn scheduled(&self) -> usize {
        self.main.scheduler.len()
            + self.sub_queues.values().map(|l| l.scheduler.len()).sum::<usize>()
    }

    pub(crate) fn is_worker(&self) -> bool {
        self.worker == Some(thread::current().id())
    }
}

/// Everything the worker thread needs; shared with every engine handle.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) state: Mutex<EngineState>,
    pub(crate) wake: Condvar,
    pub(crate) counters: EngineCounters,
    pub(crate) name: String,
    pub(crate) id: Uuid,
}

impl Shared {
    /// Execute one job outside the lock and record its outcome.
    pub(crate) fn execute(&self, job: Box<dyn Job>) {
        match job.execute() {
            JobOutcome::Completed => EngineCounters::add(&self.counters.executed, 1),
            JobOutcome::Panicked => EngineCounters::add(&self.counters.failed, 1),
        }
    }

    /// The event loop. Returns once the engine is stopped and drained.
    fn run_loop(&self) {
        let mut state = self.state.lock();
        state.worker = Some(thread::current().id());
        debug!(engine = %self.name, engine_id = %self.id, "Worker loop started");

        while state.lifecycle == Lifecycle::Running {
            let Promotion { promoted, reclaimed } = state.promote_due(Instant::now());
            if promoted > 0 || !reclaimed.is_empty() {
                debug!(
                    engine = %self.name,
                    promoted = promoted,
                    reclaimed = reclaimed.len(),
                    "Promoted due delayed jobs"
                );
            }
            if !reclaimed.is_empty() {
                EngineCounters::add(&self.counters.reclaimed, reclaimed.len());
                // Cancelled jobs may own engine handles; drop them unlocked,
                // then re-check the lifecycle before waiting.
                MutexGuard::unlocked(&mut state, || drop(reclaimed));
                continue;
            }

            if let Some(job) = state.main.queue.dequeue() {
                MutexGuard::unlocked(&mut state, || self.execute(job));
            } else if let Some(deadline) = state.next_deadline() {
                // Spurious wakeups fall through to a fresh iteration.
                self.wake.wait_until(&mut state, deadline);
            } else {
                self.wake.wait(&mut state);
            }
        }

        state.main.accepting = false;
        state.gather_sub_queues();
        let mut leftovers = std::mem::take(&mut state.main.queue);
        let mut pending = vec![std::mem::take(&mut state.main.scheduler)];
        pending.extend(
            state
                .sub_queues
                .values_mut()
                .map(|lane| std::mem::take(&mut lane.scheduler)),
        );
        drop(state);

        let discarded: usize = pending.iter().map(DelayedScheduler::len).sum();
        drop(pending);
        EngineCounters::add(&self.counters.discarded, discarded);

        let drained = leftovers.len();
        for job in leftovers.drain() {
            self.execute(job);
        }
        // Drained jobs still run on the worker and must see it as such.
        self.state.lock().worker = None;
        info!(
            engine = %self.name,
            engine_id = %self.id,
            drained = drained,
            discarded = discarded,
            "Worker loop exited"
        );
    }
}

/// Owner side of an engine. Dropping the last handle signals stop.
#[derive(Debug)]
pub(crate) struct EngineInner {
    pub(crate) shared: Arc<Shared>,
    config: EngineConfig,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        // Signal stop but never join here, so dropping cannot hang.
        let mut state = self.shared.state.lock();
        state.main.accepting = false;
        if state.lifecycle == Lifecycle::Running {
            state.lifecycle = Lifecycle::Stopped;
            self.shared.wake.notify_all();
            debug!(
                engine = %self.shared.name,
                "Engine dropped without explicit stop - worker will drain and exit detached"
            );
        }
    }
}

/// A single-consumer execution engine.
///
/// `WorkerEngine` is a cheap, cloneable handle; all clones refer to the same
/// engine. Jobs may capture a clone to submit follow-up work, including
/// blocking submissions, which are executed in place when issued from the
/// worker itself.
///
/// # Example
///
/// ```rust
/// use serial_task_queue::core::WorkerEngine;
///
/// let engine = WorkerEngine::default();
/// engine.start()?;
///
/// engine.send(|| println!("fire and forget"))?;
/// let answer = engine.send_sync(|| 6 * 7)?;
/// assert_eq!(answer, 42);
///
/// engine.stop()?;
/// engine.join()?;
/// # Ok::<(), serial_task_queue::core::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WorkerEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl Default for WorkerEngine {
    fn default() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }
}

impl WorkerEngine {
    /// Create an engine that has not started yet.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::new()),
            wake: Condvar::new(),
            counters: EngineCounters::default(),
            name: config.name.clone(),
            id: Uuid::new_v4(),
        });
        Self {
            inner: Arc::new(EngineInner {
                shared,
                config,
                handle: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    /// Start the event loop on a dedicated worker thread.
    ///
    /// # Errors
    ///
    /// - `EngineError::AlreadyStarted` unless the engine is `NotStarted`
    /// - `EngineError::Spawn` if the OS refused to create the thread
    pub fn start(&self) -> Result<(), EngineError> {
        // Early check without the handle lock: a job on the worker may call
        // this while another thread is joining.
        if self.lifecycle() != Lifecycle::NotStarted {
            return Err(EngineError::AlreadyStarted);
        }
        let mut slot = self.inner.handle.lock();
        self.begin_running()?;

        let shared = Arc::clone(&self.inner.shared);
        let mut builder = thread::Builder::new().name(self.inner.config.name.clone());
        if let Some(stack_size) = self.inner.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        match builder.spawn(move || shared.run_loop()) {
            Ok(handle) => {
                *slot = Some(handle);
                info!(
                    engine = %self.name(),
                    engine_id = %self.id(),
                    "Engine started on dedicated worker thread"
                );
                Ok(())
            }
            Err(e) => {
                self.shared().state.lock().lifecycle = Lifecycle::NotStarted;
                warn!(engine = %self.name(), error = %e, "Failed to spawn worker thread");
                Err(EngineError::Spawn(e.to_string()))
            }
        }
    }

    /// Run the event loop on the calling thread.
    ///
    /// Blocks until the engine is stopped (from a job or another thread) and
    /// the remaining queue has been drained.
    ///
    /// # Errors
    ///
    /// `EngineError::AlreadyStarted` unless the engine is `NotStarted`.
    pub fn run(&self) -> Result<(), EngineError> {
        self.begin_running()?;
        info!(
            engine = %self.name(),
            engine_id = %self.id(),
            "Engine running on calling thread"
        );
        self.inner.shared.run_loop();
        Ok(())
    }

    fn begin_running(&self) -> Result<(), EngineError> {
        let mut state = self.shared().state.lock();
        if state.lifecycle != Lifecycle::NotStarted {
            return Err(EngineError::AlreadyStarted);
        }
        state.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Request the event loop to stop.
    ///
    /// New jobs are rejected from this point on. Does not wait for an
    /// in-flight job; call [`WorkerEngine::join`] for that. Stopping an
    /// already stopped engine is a no-op.
    ///
    /// # Errors
    ///
    /// `EngineError::NotStarted` if the engine was never started.
    pub fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.shared().state.lock();
        match state.lifecycle {
            Lifecycle::NotStarted => Err(EngineError::NotStarted),
            Lifecycle::Stopped => Ok(()),
            Lifecycle::Running => {
                state.lifecycle = Lifecycle::Stopped;
                state.main.accepting = false;
                self.shared().wake.notify_all();
                info!(engine = %self.name(), engine_id = %self.id(), "Engine stop requested");
                Ok(())
            }
        }
    }

    /// Block until the worker thread has exited.
    ///
    /// A no-op if the engine never started, runs on the caller via
    /// [`WorkerEngine::run`], was already joined, or if called from the worker
    /// itself. This includes jobs drained after stop.
    ///
    /// # Errors
    ///
    /// `EngineError::WorkerPanicked` if the worker thread panicked. Closure
    /// jobs contain their own panics, so this only happens when a custom
    /// [`Job::execute`] unwinds, for example one submitted with
    /// [`WorkerEngine::send_job`].
    pub fn join(&self) -> Result<(), EngineError> {
        if self.is_worker_thread() {
            return Ok(());
        }
        let mut slot = self.inner.handle.lock();
        let Some(handle) = slot.take() else {
            return Ok(());
        };
        match handle.join() {
            Ok(()) => {
                debug!(engine = %self.name(), "Worker thread joined");
                Ok(())
            }
            Err(_) => {
                warn!(engine = %self.name(), "Worker thread panicked");
                Err(EngineError::WorkerPanicked)
            }
        }
    }

    /// Discard every queued and delayed job and stop accepting new ones.
    ///
    /// Cascades to every sub-queue created from this engine. The loop keeps
    /// running idle until [`WorkerEngine::stop`]. Result handles of discarded
    /// jobs report `JobError::Abandoned`. Returns the number of jobs discarded.
    pub fn cancel_all(&self) -> usize {
        let lanes = {
            let mut state = self.shared().state.lock();
            let mut lanes = vec![state.main.cancel()];
            lanes.extend(state.sub_queues.values_mut().map(Lane::cancel));
            self.shared().wake.notify_all();
            lanes
        };
        let discarded: usize = lanes.iter().map(Lane::len).sum();
        drop(lanes);
        EngineCounters::add(&self.shared().counters.discarded, discarded);
        info!(engine = %self.name(), discarded = discarded, "Cancelled all pending jobs");
        discarded
    }

    /// Create a sub-queue served by this engine's worker.
    ///
    /// A sub-queue has its own FIFO queue, delayed jobs and `cancel_all`, but
    /// shares the worker thread and the engine's accept flag: once the engine
    /// stops or cancels, the sub-queue rejects jobs too. Its jobs are moved
    /// behind the engine's pending jobs at every loop iteration.
    #[must_use]
    pub fn create_sub_queue(&self) -> SubQueue {
        let id = {
            let mut state = self.shared().state.lock();
            let id = state.next_sub_queue;
            state.next_sub_queue += 1;
            let accepting = state.main.accepting;
            state.sub_queues.insert(id, Lane::new(accepting));
            id
        };
        debug!(engine = %self.name(), sub_queue = id, "Sub-queue created");
        SubQueue::new(Arc::clone(&self.inner.shared), id)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared().state.lock().lifecycle
    }

    /// Whether the event loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Whether dispatch operations are currently accepted.
    #[must_use]
    pub fn accepts_jobs(&self) -> bool {
        self.shared().state.lock().main.accepting
    }

    /// Whether the calling thread is this engine's worker.
    #[must_use]
    pub fn is_worker_thread(&self) -> bool {
        self.shared().state.lock().is_worker()
    }

    /// Worker thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.shared.name
    }

    /// Unique id of this engine instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.shared.id
    }

    /// Configuration the engine was built from.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Get current engine statistics.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let (queued, scheduled) = {
            let state = self.shared().state.lock();
            (state.queued(), state.scheduled())
        };
        self.shared().counters.snapshot(queued, scheduled)
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }
}

/// Non-owning engine reference.
#[derive(Debug, Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<WorkerEngine> {
        self.0.upgrade().map(|inner| WorkerEngine { inner })
    }
}
