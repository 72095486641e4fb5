//! Centralized default values for the pharmacy assistant
//!
//! Settings defaults read from here so a value is only spelled once.

/// Conversation and rendering defaults
pub mod assistant {
    /// Currency symbol prefixed to every rendered amount
    pub const CURRENCY_SYMBOL: &str = "₹";

    /// Store name used in the anonymous greeting
    pub const STORE_NAME: &str = "Medi-Flow Systems";

    /// Turns kept per conversation
    pub const CONTEXT_HISTORY_LIMIT: usize = 5;

    /// How often idle contexts are swept when a TTL is configured
    pub const CONTEXT_SWEEP_INTERVAL_SECS: u64 = 60;

    /// Upper bound on a single gateway call
    pub const GATEWAY_TIMEOUT_MS: u64 = 5_000;

    /// Orders listed by the history intent
    pub const ORDER_HISTORY_LIMIT: usize = 10;
}

/// Server defaults
pub mod server {
    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 8080;
    pub const TIMEOUT_SECONDS: u64 = 30;
    pub const CORS_FALLBACK_ORIGIN: &str = "http://localhost:3000";
}

/// File locations for the file-backed stores
pub mod persistence {
    pub const DATA_DIR: &str = "data";
    pub const AUDIT_LOG_FILE: &str = "chat_audit.jsonl";
    pub const TRAINING_FILE: &str = "training_data.json";
}

/// Environment variable names
pub mod env {
    /// Prefix for settings overrides, e.g. `PHARMACY_ASSISTANT__SERVER__PORT`
    pub const SETTINGS_PREFIX: &str = "PHARMACY_ASSISTANT";

    /// Selects `config/{env}` on top of `config/default`
    pub const ENVIRONMENT: &str = "PHARMACY_ASSISTANT_ENV";
}
