//! Configuration management
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//!
//! # Usage
//!
//! ```no_run
//! use opds_fulfill::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("PDF support: {}", config.capabilities.pdf);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `OPDS_FULFILL__<section>__<key>`:
//! - `OPDS_FULFILL__CAPABILITIES__ADOBE_DRM=true`
//! - `OPDS_FULFILL__HTTP__MAX_DOWNLOAD_BYTES=100MB`
//! - `OPDS_FULFILL__RESOLUTION__STRICT=true`
//!
//! # Configuration File
//!
//! Read from `config/opds-fulfill.toml` unless `OPDS_FULFILL_CONFIG` points
//! elsewhere. A missing file is not an error.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, FulfillmentSettings, HttpSettings, LinearizerSettings, LoggingSettings,
    ResolutionSettings,
};
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
    /// Load configuration from all sources (file + environment) and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path. Useful for tests.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
