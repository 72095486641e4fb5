//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{assistant, env, persistence, server};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Conversation, rendering and gateway behaviour
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Audit log and feedback storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Seed data for the in-process catalog and knowledge base
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_assistant()?;
        self.validate_persistence()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_production() && !server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS cannot be disabled in production".to_string(),
            });
        }

        Ok(())
    }

    fn validate_assistant(&self) -> Result<(), ConfigError> {
        let assistant = &self.assistant;

        if assistant.context_history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "assistant.context_history_limit".to_string(),
                message: "Must keep at least 1 turn".to_string(),
            });
        }

        if assistant.currency_symbol.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "assistant.currency_symbol".to_string(),
            ));
        }

        if assistant.gateway_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "assistant.gateway_timeout_ms".to_string(),
                message: "Must be at least 1ms".to_string(),
            });
        }

        if let Some(ttl) = assistant.context_idle_ttl_secs {
            if ttl == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "assistant.context_idle_ttl_secs".to_string(),
                    message: "Use null to disable expiry instead of 0".to_string(),
                });
            }
            if assistant.context_sweep_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "assistant.context_sweep_interval_secs".to_string(),
                    message: "Must be at least 1 second when expiry is enabled".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        let persistence = &self.persistence;
        if persistence.enabled && persistence.data_dir.trim().is_empty() {
            return Err(ConfigError::MissingField("persistence.data_dir".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    server::HOST.to_string()
}
fn default_port() -> u16 {
    server::PORT
}
fn default_timeout() -> u64 {
    server::TIMEOUT_SECONDS
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Conversation, rendering and gateway behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Currency symbol used in every rendered amount
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Store name used in the anonymous greeting
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Turns kept per conversation; older turns are evicted first
    #[serde(default = "default_context_history_limit")]
    pub context_history_limit: usize,

    /// Idle time after which a conversation is dropped. `None` keeps contexts
    /// until they are cleared explicitly.
    #[serde(default)]
    pub context_idle_ttl_secs: Option<u64>,

    /// Sweep period for idle contexts
    #[serde(default = "default_context_sweep_interval_secs")]
    pub context_sweep_interval_secs: u64,

    /// Upper bound on a single gateway call
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,

    /// Orders fetched for the history intent
    #[serde(default = "default_order_history_limit")]
    pub order_history_limit: usize,
}

fn default_currency_symbol() -> String {
    assistant::CURRENCY_SYMBOL.to_string()
}
fn default_store_name() -> String {
    assistant::STORE_NAME.to_string()
}
fn default_context_history_limit() -> usize {
    assistant::CONTEXT_HISTORY_LIMIT
}
fn default_context_sweep_interval_secs() -> u64 {
    assistant::CONTEXT_SWEEP_INTERVAL_SECS
}
fn default_gateway_timeout_ms() -> u64 {
    assistant::GATEWAY_TIMEOUT_MS
}
fn default_order_history_limit() -> usize {
    assistant::ORDER_HISTORY_LIMIT
}

impl AssistantConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_millis(self.gateway_timeout_ms)
    }

    pub fn context_idle_ttl(&self) -> Option<Duration> {
        self.context_idle_ttl_secs.map(Duration::from_secs)
    }

    pub fn context_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.context_sweep_interval_secs)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            store_name: default_store_name(),
            context_history_limit: default_context_history_limit(),
            context_idle_ttl_secs: None,
            context_sweep_interval_secs: default_context_sweep_interval_secs(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
            order_history_limit: default_order_history_limit(),
        }
    }
}

/// Audit log and feedback storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// File-backed stores (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    /// Directory holding the store files and training exports
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Audit log file name inside `data_dir`
    #[serde(default = "default_audit_log_file")]
    pub audit_log_file: String,

    /// Training metrics file name inside `data_dir`
    #[serde(default = "default_training_file")]
    pub training_file: String,
}

fn default_data_dir() -> String {
    persistence::DATA_DIR.to_string()
}
fn default_audit_log_file() -> String {
    persistence::AUDIT_LOG_FILE.to_string()
}
fn default_training_file() -> String {
    persistence::TRAINING_FILE.to_string()
}

impl PersistenceConfig {
    pub fn audit_log_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.audit_log_file)
    }

    pub fn training_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.training_file)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Disabled by default for development
            data_dir: default_data_dir(),
            audit_log_file: default_audit_log_file(),
            training_file: default_training_file(),
        }
    }
}

/// Seed files for the in-process catalog and drug knowledge base
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON file with products, customers and orders
    #[serde(default)]
    pub seed_path: Option<String>,

    /// JSON array of drug knowledge records
    #[serde(default)]
    pub knowledge_base_path: Option<String>,
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env_name: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name("config/default").required(false));

    // Load environment-specific config
    if let Some(env_name) = env_name {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix(env::SETTINGS_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    if settings.environment.is_strict() && settings.server.cors_origins.is_empty() {
        tracing::warn!(
            environment = ?settings.environment,
            "No CORS origins configured, falling back to {}",
            server::CORS_FALLBACK_ORIGIN
        );
    }
    tracing::debug!(environment = ?settings.environment, "Settings loaded");

    Ok(settings)
}
