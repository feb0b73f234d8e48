//! Tests for configuration validation

use serial_task_queue::config::engine::{ENV_ENGINE_NAME, ENV_STACK_SIZE, MIN_STACK_SIZE};
use serial_task_queue::config::{EngineConfig, RegistryConfig};

#[test]
fn test_engine_config_validation() {
    let valid = EngineConfig::new().with_name("io").with_stack_size(MIN_STACK_SIZE);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_engine_config_invalid_name() {
    assert!(EngineConfig::new().with_name("   ").validate().is_err());
    assert!(EngineConfig::new().with_name("bad\0name").validate().is_err());
}

#[test]
fn test_engine_config_invalid_stack_size() {
    let invalid = EngineConfig::new().with_stack_size(MIN_STACK_SIZE - 1);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_engine_config_from_json() {
    let cfg = EngineConfig::from_json_str(r#"{ "name": "render", "stack_size": 1048576 }"#).unwrap();
    assert_eq!(cfg.name, "render");
    assert_eq!(cfg.stack_size, Some(1_048_576));
}

#[test]
fn test_engine_config_from_json_rejects_garbage() {
    let err = EngineConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_engine_config_json_round_trip() {
    let cfg = EngineConfig::new().with_name("db").with_stack_size(64 * 1024);
    let json = serde_json::to_string(&cfg).unwrap();
    assert_eq!(EngineConfig::from_json_str(&json).unwrap(), cfg);
}

#[test]
fn test_engine_config_from_env() {
    std::env::set_var(ENV_ENGINE_NAME, "env-engine");
    std::env::set_var(ENV_STACK_SIZE, "65536");
    let cfg = EngineConfig::from_env().unwrap();
    assert_eq!(cfg.name, "env-engine");
    assert_eq!(cfg.stack_size, Some(65_536));

    std::env::set_var(ENV_STACK_SIZE, "lots");
    assert!(EngineConfig::from_env().is_err());

    std::env::remove_var(ENV_ENGINE_NAME);
    std::env::remove_var(ENV_STACK_SIZE);
}

#[test]
fn test_registry_config_from_json() {
    let json = r#"{
        "engines": {
            "ui": { "name": "ui-loop" },
            "io": { "name": "io-loop", "stack_size": 262144 }
        }
    }"#;
    let cfg = RegistryConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.engines.len(), 2);
    assert_eq!(cfg.engines["io"].stack_size, Some(262_144));
}

#[test]
fn test_registry_config_names_invalid_engine() {
    let json = r#"{ "engines": { "broken": { "name": "" } } }"#;
    let err = RegistryConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("broken"), "{err}");
}

#[test]
fn test_registry_config_requires_an_engine() {
    assert!(RegistryConfig::default().validate().is_err());
}
