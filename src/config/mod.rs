//! Configuration models for engines and engine registries.

pub mod engine;

pub use engine::{EngineConfig, RegistryConfig};
