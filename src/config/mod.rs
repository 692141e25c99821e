//! Configuration management for dispatchbox
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Environment Variables
//!
//! Any key can be overridden with `DISPATCHBOX__<section>__<key>`:
//! - `DISPATCHBOX__QUEUE__RESULT_URL=https://sqs.../results`
//! - `DISPATCHBOX__PROVIDER__HOST_MARKER=chakrahq.com`
//! - `DISPATCHBOX__WORKER__MAX_CONCURRENT_JOBS=16`
//!
//! # Configuration File
//!
//! Loaded from `config/dispatchbox.toml` unless `DISPATCHBOX_CONFIG` points
//! elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use models::{Config, HttpSettings, ProviderConfig, QueueConfig, WorkerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
