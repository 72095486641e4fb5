//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

use pharmacy_assistant_agent::{
    ContextStore, Dispatcher, ExpertAssistant, FeedbackTracker, InMemoryContextStore,
};
use pharmacy_assistant_config::{load_settings, Settings};
use pharmacy_assistant_persistence::{AuditLog, PersistenceLayer};
use pharmacy_assistant_tools::{CatalogGateway, KnowledgeBase};

use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration wrapped in RwLock for hot-reload support
    pub config: Arc<RwLock<Settings>>,
    /// Action assistant
    pub dispatcher: Arc<Dispatcher>,
    /// Drug expert
    pub expert: Arc<ExpertAssistant>,
    /// Feedback and accuracy analytics
    pub tracker: Arc<FeedbackTracker>,
    pub audit: Arc<dyn AuditLog>,
    /// Conversation contexts shared by the dispatcher and the expert
    pub contexts: Arc<dyn ContextStore>,
    /// Prometheus handle; `None` when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
    /// Environment name for config reload
    env: Option<String>,
}

impl AppState {
    /// Wire the assistant over a catalog gateway, knowledge base and stores
    pub async fn new(
        config: Settings,
        gateway: Arc<dyn CatalogGateway>,
        knowledge: Arc<dyn KnowledgeBase>,
        persistence: PersistenceLayer,
    ) -> Result<Self, ServerError> {
        let contexts: Arc<dyn ContextStore> =
            Arc::new(InMemoryContextStore::from_config(&config.assistant));

        let tracker = Arc::new(
            FeedbackTracker::load(
                persistence.feedback.clone(),
                persistence.audit.clone(),
                PathBuf::from(&config.persistence.data_dir),
            )
            .await?,
        );

        let expert = Arc::new(ExpertAssistant::new(
            knowledge,
            contexts.clone(),
            persistence.audit.clone(),
            tracker.clone(),
        ));

        let dispatcher = Dispatcher::new(gateway, contexts.clone(), persistence.audit.clone())?
            .with_settings(&config.assistant)
            .with_expert(expert.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            dispatcher: Arc::new(dispatcher),
            expert,
            tracker,
            audit: persistence.audit,
            contexts,
            metrics: None,
            env: None,
        })
    }

    /// Environment name used when reloading configuration
    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Reload configuration from files
    ///
    /// Reloads config from disk and updates the shared state. Settings baked
    /// into the dispatcher and the router at startup keep their old values.
    pub fn reload_config(&self) -> Result<(), String> {
        let new_config = load_settings(self.env.as_deref())
            .map_err(|e| format!("Failed to reload config: {}", e))?;

        let mut config = self.config.write();
        *config = new_config;

        tracing::info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Get a read guard to the current configuration
    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }
}
