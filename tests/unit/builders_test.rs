//! Tests for builder modules

use serial_task_queue::builders::{build_engines, EngineBuilder};
use serial_task_queue::config::{EngineConfig, RegistryConfig};
use serial_task_queue::core::{EngineError, Lifecycle};

#[test]
fn test_engine_builder_defaults() {
    let builder = EngineBuilder::new();
    assert_eq!(builder.config(), &EngineConfig::default());

    let engine = builder.build().unwrap();
    assert_eq!(engine.name(), serial_task_queue::config::engine::DEFAULT_ENGINE_NAME);
    assert_eq!(engine.lifecycle(), Lifecycle::NotStarted);
}

#[test]
fn test_engine_builder_rejects_invalid_config() {
    let result = EngineBuilder::new().name("").build();
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
}

#[test]
fn test_build_engines_from_registry() {
    let cfg = RegistryConfig::from_json_str(
        r#"{ "engines": { "ui": { "name": "ui-loop" }, "io": { "name": "io-loop" } } }"#,
    )
    .unwrap();

    let engines = build_engines(&cfg).unwrap();
    assert_eq!(engines.len(), 2);
    assert_eq!(engines["ui"].name(), "ui-loop");
    assert_eq!(engines["io"].name(), "io-loop");
    assert_ne!(engines["ui"].id(), engines["io"].id());
    assert!(engines.values().all(|e| e.lifecycle() == Lifecycle::NotStarted));
}

#[test]
fn test_built_engines_run_independently() {
    let mut cfg = RegistryConfig::default();
    cfg.engines.insert("a".into(), EngineConfig::new().with_name("engine-a"));
    cfg.engines.insert("b".into(), EngineConfig::new().with_name("engine-b"));

    let engines = build_engines(&cfg).unwrap();
    for engine in engines.values() {
        engine.start().unwrap();
    }
    let a = engines["a"]
        .send_sync(|| std::thread::current().name().map(str::to_owned))
        .unwrap();
    let b = engines["b"]
        .send_sync(|| std::thread::current().name().map(str::to_owned))
        .unwrap();
    assert_eq!(a.as_deref(), Some("engine-a"));
    assert_eq!(b.as_deref(), Some("engine-b"));

    for engine in engines.values() {
        engine.stop().unwrap();
        engine.join().unwrap();
    }
}

#[test]
fn test_build_engines_rejects_invalid_entry() {
    let mut cfg = RegistryConfig::default();
    cfg.engines
        .insert("tiny".into(), EngineConfig::new().with_stack_size(1));
    assert!(matches!(build_engines(&cfg), Err(EngineError::InvalidConfig(_))));
}
