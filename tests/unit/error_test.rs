//! Tests for error types

use serial_task_queue::core::{AppResult, EngineError, JobError};

#[test]
fn test_already_started_error() {
    let err = EngineError::AlreadyStarted;
    assert_eq!(format!("{}", err), "engine already started");
}

#[test]
fn test_not_started_error() {
    let err = EngineError::NotStarted;
    assert_eq!(format!("{}", err), "engine not started");
}

#[test]
fn test_not_accepting_messages_error() {
    let err = EngineError::NotAcceptingMessages;
    assert_eq!(format!("{}", err), "engine is not accepting messages");
}

#[test]
fn test_spawn_error() {
    let err = EngineError::Spawn("resource temporarily unavailable".to_string());
    assert_eq!(
        format!("{}", err),
        "failed to spawn worker thread: resource temporarily unavailable"
    );
}

#[test]
fn test_invalid_config_error() {
    let err = EngineError::InvalidConfig("name must not be empty".to_string());
    assert_eq!(format!("{}", err), "invalid configuration: name must not be empty");
}

#[test]
fn test_job_errors() {
    assert_eq!(JobError::Panicked("boom".into()).to_string(), "job panicked: boom");
    assert_eq!(
        JobError::Abandoned.to_string(),
        "job was dropped before it produced a result"
    );
    assert_eq!(JobError::Timeout.to_string(), "timed out waiting for job result");
}

#[test]
fn test_job_error_source_is_preserved() {
    use std::error::Error;

    let err = EngineError::from(JobError::Abandoned);
    let source = err.source().expect("job errors are wrapped transparently");
    assert_eq!(source.to_string(), JobError::Abandoned.to_string());
}

#[test]
fn test_app_result_context() {
    use anyhow::Context;

    fn start_twice() -> AppResult<()> {
        Err(EngineError::AlreadyStarted).context("booting ui engine")
    }

    let err = start_twice().unwrap_err();
    assert_eq!(err.to_string(), "booting ui engine");
    assert!(err.downcast_ref::<EngineError>().is_some());
}
