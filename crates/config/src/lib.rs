//! Configuration management for the pharmacy assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML/JSON files under `config/`
//! - Environment variables (`PHARMACY_ASSISTANT__` prefix)
//! - Runtime reloads through the admin endpoint

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AssistantConfig, CatalogConfig, ObservabilityConfig, PersistenceConfig,
    RuntimeEnvironment, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
