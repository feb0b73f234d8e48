//! Builders to construct engines from configuration.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{EngineConfig, RegistryConfig};
use crate::core::{EngineError, WorkerEngine};

/// Fluent builder for a single [`WorkerEngine`].
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.config.stack_size = Some(stack_size);
        self
    }

    /// Configuration accumulated so far.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate the configuration and create the engine. The engine is not
    /// started.
    ///
    /// # Errors
    ///
    /// `EngineError::InvalidConfig` if validation fails.
    pub fn build(self) -> Result<WorkerEngine, EngineError> {
        WorkerEngine::new(self.config)
    }
}

/// Build one engine per registry entry, keyed like the configuration.
///
/// Engines are returned unstarted so callers control when worker threads
/// appear.
///
/// # Errors
///
/// `EngineError::InvalidConfig` if the registry fails validation.
pub fn build_engines(cfg: &RegistryConfig) -> Result<HashMap<String, WorkerEngine>, EngineError> {
    cfg.validate().map_err(EngineError::InvalidConfig)?;

    let mut engines = HashMap::with_capacity(cfg.engines.len());
    for (key, engine_cfg) in &cfg.engines {
        let engine = EngineBuilder::from_config(engine_cfg.clone()).build()?;
        debug!(key = %key, engine = %engine.name(), engine_id = %engine.id(), "Engine built");
        engines.insert(key.clone(), engine);
    }

    Ok(engines)
}
