//! Persistence layer for the pharmacy assistant
//!
//! Provides storage for:
//! - Chat audit records (one per answered query, flaggable)
//! - Training feedback, accuracy counters and ratings
//!
//! File-backed stores live under the configured data directory; with
//! persistence disabled everything is kept in memory.

pub mod audit;
pub mod error;
pub mod feedback;

pub use audit::{AuditLog, AuditRecord, InMemoryAuditLog, JsonlAuditLog};
pub use error::PersistenceError;
pub use feedback::{
    default_export_path, read_export, write_export, AccuracyCounter, FeedbackEntry, FeedbackStore,
    InMemoryFeedbackStore, JsonFileFeedbackStore, TrainingExport, TrainingSnapshot,
};

use pharmacy_assistant_config::PersistenceConfig;
use std::sync::Arc;

/// Initialize the persistence layer from configuration
pub async fn init(config: &PersistenceConfig) -> Result<PersistenceLayer, PersistenceError> {
    if !config.enabled {
        tracing::info!("Persistence disabled, using in-memory stores");
        return Ok(PersistenceLayer::in_memory());
    }

    let audit = JsonlAuditLog::open(config.audit_log_path()).await?;
    let feedback = JsonFileFeedbackStore::new(config.training_path());
    tracing::info!(
        audit = %audit.path().display(),
        training = %feedback.path().display(),
        "Persistence initialized"
    );

    Ok(PersistenceLayer {
        audit: Arc::new(audit),
        feedback: Arc::new(feedback),
    })
}

/// Combined persistence layer with all stores
#[derive(Clone)]
pub struct PersistenceLayer {
    pub audit: Arc<dyn AuditLog>,
    pub feedback: Arc<dyn FeedbackStore>,
}

impl PersistenceLayer {
    pub fn in_memory() -> Self {
        Self {
            audit: Arc::new(InMemoryAuditLog::new()),
            feedback: Arc::new(InMemoryFeedbackStore::new()),
        }
    }
}
