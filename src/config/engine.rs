//! Engine and registry configuration structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default worker thread name.
pub const DEFAULT_ENGINE_NAME: &str = "serial-queue";

/// Smallest worker stack size accepted by validation.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Environment variable holding the worker thread name.
pub const ENV_ENGINE_NAME: &str = "SERIAL_QUEUE_NAME";

/// Environment variable holding the worker stack size in bytes.
pub const ENV_STACK_SIZE: &str = "SERIAL_QUEUE_STACK_SIZE";

/// Configuration for a single engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name given to the worker thread; also used in log fields.
    pub name: String,
    /// Stack size for the worker thread. `None` keeps the platform default.
    pub stack_size: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ENGINE_NAME.to_string(),
            stack_size: None,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.name.contains('\0') {
            return Err("name must not contain NUL bytes".into());
        }
        if let Some(stack_size) = self.stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(format!("stack_size must be at least {MIN_STACK_SIZE} bytes"));
            }
        }
        Ok(())
    }

    /// Parse an engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build a configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of an unparsable stack size or a validation failure.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Ok(name) = std::env::var(ENV_ENGINE_NAME) {
            cfg.name = name;
        }
        if let Ok(raw) = std::env::var(ENV_STACK_SIZE) {
            let stack_size = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| format!("{ENV_STACK_SIZE} invalid: {e}"))?;
            cfg.stack_size = Some(stack_size);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Configuration for a set of named engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Map of engine key to configuration.
    pub engines: HashMap<String, EngineConfig>,
}

impl RegistryConfig {
    /// Validate all engines and ensure at least one exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid engine.
    pub fn validate(&self) -> Result<(), String> {
        if self.engines.is_empty() {
            return Err("at least one engine must be defined".into());
        }
        for (key, engine) in &self.engines {
            engine
                .validate()
                .map_err(|e| format!("engine `{key}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse registry configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
