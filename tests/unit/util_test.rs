//! Tests for utility functions

use serial_task_queue::core::WorkerEngine;
use serial_task_queue::util::{init_tracing, init_tracing_with, DEFAULT_LOG_FILTER};

#[test]
fn test_init_tracing_with_running_engine() {
    init_tracing();
    assert!(!init_tracing_with(DEFAULT_LOG_FILTER));

    let engine = WorkerEngine::default();
    engine.start().unwrap();
    assert_eq!(engine.send_sync(|| 1 + 1).unwrap(), 2);
    engine.stop().unwrap();
    engine.join().unwrap();
}

#[test]
fn test_default_filter_targets_this_crate() {
    assert!(DEFAULT_LOG_FILTER.starts_with("serial_task_queue="));
}
