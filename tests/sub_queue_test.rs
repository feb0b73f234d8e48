//! Integration tests for sub-queues sharing a parent engine's worker

use parking_lot::Mutex;
use serial_task_queue::core::{EngineError, JobError, WorkerEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn named_engine(name: &str) -> WorkerEngine {
    let engine = serial_task_queue::builders::EngineBuilder::new()
        .name(name)
        .build()
        .unwrap();
    engine.start().unwrap();
    engine
}

fn shutdown(engine: &WorkerEngine) {
    engine.stop().unwrap();
    engine.join().unwrap();
}

/// Holds the worker inside a job until the returned sender is dropped.
fn block_worker(engine: &WorkerEngine) -> crossbeam_channel::Sender<()> {
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
    engine
        .send(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    release_tx
}

// ============================================================================
// EXECUTION
// ============================================================================

#[test]
fn test_sub_queue_runs_on_parent_worker() {
    let engine = named_engine("parent");
    let sub = engine.create_sub_queue();

    let name = sub
        .send_sync(|| thread::current().name().map(str::to_owned))
        .unwrap();
    assert_eq!(name.as_deref(), Some("parent"));
    shutdown(&engine);
}

#[test]
fn test_sub_queue_jobs_keep_fifo_order_behind_parent_work() {
    let engine = named_engine("ordering");
    let sub = engine.create_sub_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let blocker = block_worker(&engine);
    for id in 1..=3 {
        let log = Arc::clone(&log);
        sub.send(move || log.lock().push(id)).unwrap();
    }
    let parent_log = Arc::clone(&log);
    engine.send(move || parent_log.lock().push(0)).unwrap();
    drop(blocker);
    engine.send_wait(|| {}).unwrap();

    assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    shutdown(&engine);
}

#[test]
fn test_delayed_sub_queue_job_fires() {
    let engine = named_engine("delayed");
    let sub = engine.create_sub_queue();
    let (tx, rx) = crossbeam_channel::bounded(1);

    let token = sub
        .send_delayed(move || tx.send(()).unwrap(), Duration::from_millis(30))
        .unwrap();
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    assert!(token.is_executed());
    shutdown(&engine);
}

#[test]
fn test_reentrant_send_sync_on_sub_queue() {
    let engine = named_engine("reentrant-sub");
    let sub = Arc::new(engine.create_sub_queue());
    let inner = Arc::clone(&sub);

    let value = sub
        .send_sync(move || inner.is_worker_thread() && inner.send_sync(|| 2).unwrap() == 2)
        .unwrap();
    assert!(value);
    shutdown(&engine);
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[test]
fn test_sub_queue_cancel_all_leaves_parent_working() {
    let engine = named_engine("sub-cancel");
    let sub = engine.create_sub_queue();
    let sibling = engine.create_sub_queue();
    let count = Arc::new(AtomicUsize::new(0));

    let blocker = block_worker(&engine);
    for _ in 0..5 {
        let count = Arc::clone(&count);
        sub.send(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }
    assert_eq!(sub.cancel_all(), 5);
    drop(blocker);

    assert!(engine.send_sync(|| true).unwrap());
    assert!(sibling.send_sync(|| true).unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(matches!(sub.send(|| {}), Err(EngineError::NotAcceptingMessages)));
    shutdown(&engine);
}

#[test]
fn test_parent_cancel_all_cascades_to_sub_queues() {
    let engine = named_engine("cascade");
    let sub = engine.create_sub_queue();

    let blocker = block_worker(&engine);
    let handle = sub.send_async(|| 1).unwrap();
    let token = sub.send_delayed(|| {}, Duration::from_secs(60)).unwrap();
    engine.send(|| {}).unwrap();

    assert_eq!(engine.cancel_all(), 3);
    drop(blocker);

    assert_eq!(handle.wait(), Err(JobError::Abandoned));
    assert!(token.is_executed());
    assert!(!sub.accepts_jobs());
    assert!(matches!(sub.send(|| {}), Err(EngineError::NotAcceptingMessages)));
    shutdown(&engine);
}

#[test]
fn test_dropped_sub_queue_discards_delayed_jobs() {
    let engine = named_engine("dropped-sub");
    let sub = engine.create_sub_queue();
    let count = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&count);
    let token = sub
        .send_delayed(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            Duration::from_millis(30),
        )
        .unwrap();
    drop(sub);
    thread::sleep(Duration::from_millis(80));
    engine.send_wait(|| {}).unwrap();

    assert!(token.is_executed());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    shutdown(&engine);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_parent_stop_drains_sub_queue_and_rejects_new_jobs() {
    let engine = named_engine("stop-sub");
    let sub = engine.create_sub_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let blocker = block_worker(&engine);
    for id in 1..=3 {
        let log = Arc::clone(&log);
        sub.send(move || log.lock().push(id)).unwrap();
    }
    let delayed = sub.send_delayed(|| {}, Duration::from_secs(60)).unwrap();

    engine.stop().unwrap();
    assert!(matches!(sub.send(|| {}), Err(EngineError::NotAcceptingMessages)));
    assert!(matches!(sub.send_sync(|| 1), Err(EngineError::NotAcceptingMessages)));
    drop(blocker);
    engine.join().unwrap();

    assert_eq!(*log.lock(), vec![1, 2, 3]);
    assert!(delayed.is_executed());
    assert_eq!(engine.stats().discarded, 1);
}
