//! Signals: broadcast values to listeners, each on its own engine.
//!
//! A listener connects with the engine it wants its callback to run on. When
//! the signal is emitted, every listener receives a clone of the value as a
//! fire-and-forget job on that engine, or inline when the emitter already runs
//! on the listener's worker thread.
//!
//! ```rust
//! use serial_task_queue::core::{Signal, WorkerEngine};
//!
//! let engine = WorkerEngine::default();
//! engine.start()?;
//!
//! let progress = Signal::<u32>::new();
//! let _connection = progress.connect(&engine, |percent| println!("{percent}%"));
//! progress.emit(&50);
//!
//! engine.stop()?;
//! engine.join()?;
//! # Ok::<(), serial_task_queue::core::EngineError>(())
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::engine::{WeakEngine, WorkerEngine};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A connected listener.
struct Slot<T> {
    id: u64,
    engine: WeakEngine,
    callback: Callback<T>,
}

/// Listener storage shared between a signal and its connections.
struct SlotRegistry<T> {
    slots: Mutex<Vec<Slot<T>>>,
}

/// Removal of a listener by id, independent of the signal's value type.
trait Disconnect: Send + Sync {
    fn disconnect(&self, id: u64) -> bool;
}

impl<T> Disconnect for SlotRegistry<T> {
    fn disconnect(&self, id: u64) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        slots.len() != before
    }
}

/// Broadcast point for values of type `T`.
pub struct Signal<T> {
    registry: Arc<SlotRegistry<T>>,
    next_id: AtomicU64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(SlotRegistry {
                slots: Mutex::new(Vec::new()),
            }),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Create a signal with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run on `engine` whenever the signal is emitted.
    ///
    /// The listener stays connected until the returned [`Connection`] is
    /// closed or dropped. The engine is referenced weakly.
    pub fn connect<F>(&self, engine: &WorkerEngine, callback: F) -> Connection
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.slots.lock().push(Slot {
            id,
            engine: engine.downgrade(),
            callback: Arc::new(callback),
        });
        let registry: Arc<dyn Disconnect> = self.registry.clone();
        Connection {
            registry: Some(Arc::downgrade(&registry)),
            id,
        }
    }

    /// Deliver `value` to every listener.
    ///
    /// Never fails: listeners whose engine is gone or no longer accepts jobs
    /// are skipped.
    pub fn emit(&self, value: &T) {
        // Snapshot so callbacks run without the registry lock held.
        let targets: Vec<(WeakEngine, Callback<T>)> = self
            .registry
            .slots
            .lock()
            .iter()
            .map(|slot| (slot.engine.clone(), Arc::clone(&slot.callback)))
            .collect();

        for (engine, callback) in targets {
            let Some(engine) = engine.upgrade() else {
                debug!("Signal listener skipped: engine dropped");
                continue;
            };
            if engine.is_worker_thread() {
                callback(value);
                continue;
            }
            let callback: Weak<dyn Fn(&T) + Send + Sync> = Arc::downgrade(&callback);
            let value = value.clone();
            let delivery = engine.send(move || {
                // The connection may have closed while this was queued.
                if let Some(callback) = callback.upgrade() {
                    callback(&value);
                }
            });
            if let Err(e) = delivery {
                debug!(engine = %engine.name(), error = %e, "Signal listener skipped");
            }
        }
    }

    /// Disconnect every listener.
    pub fn disconnect_all(&self) {
        self.registry.slots.lock().clear();
    }
}

impl<T> Signal<T> {
    /// Number of connected listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.slots.lock().len()
    }
}

/// Keeps a signal listener connected until closed or dropped.
pub struct Connection {
    registry: Option<Weak<dyn Disconnect>>,
    id: u64,
}

impl Connection {
    /// Disconnect the listener. Idempotent.
    ///
    /// Deliveries already queued on the listener's engine are skipped.
    pub fn close(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.disconnect(self.id);
        }
    }

    /// Whether the listener is still registered with a live signal.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}
