//! Configuration management for vidbundle
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use vidbundle::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `VIDBUNDLE__<section>__<key>`
//!
//! Examples:
//! - `VIDBUNDLE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `VIDBUNDLE__JOBS__CONCURRENCY=2`
//! - `VIDBUNDLE__RETRIEVAL__ALLOWED_DOMAINS=tiktok.com,vm.tiktok.com`
//!
//! `TIKTOK_COOKIES_PATH` and `TIKTOK_VIDEO_FORMAT` are also read and take
//! precedence for the retrieval cookie file and format expression.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/vidbundle.toml`.
//! This can be overridden using the `VIDBUNDLE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use crate::humanize::ByteSize;
pub use models::{ApiLimits, ArchiveConfig, Config, JobsConfig, RetrievalConfig, ServerConfig};
pub use validation::{MAX_CONCURRENCY, MAX_URLS_CEILING, ValidationError};

use std::path::PathBuf;
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
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`VIDBUNDLE__*`, then the legacy `TIKTOK_*` pair)
    /// 2. TOML file (default: `config/vidbundle.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(sources::default_path())
    }

    /// Same as [`Config::load`] with an explicit file path
    pub fn load_with_env(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, skipping `.env` and the
    /// legacy variables
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}
