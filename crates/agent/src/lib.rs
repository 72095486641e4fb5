//! Conversational core of the pharmacy assistant
//!
//! Features:
//! - Action dispatch: intent → gateway operation → rendered reply
//! - Per-session conversation context with pronoun and follow-up resolution
//! - Rule-based drug expert over a knowledge base
//! - Feedback tracking and accuracy analytics

pub mod context;
pub mod dispatcher;
pub mod expert;
pub mod renderer;
pub mod training;

pub use context::{ContextHandle, ContextStore, ConversationContext, InMemoryContextStore};
pub use dispatcher::{extract_order_id, extract_product_id, Dispatcher};
pub use expert::{
    apply_rules, generate_response, ExpertAnswer, ExpertAssistant, GeneratedResponse,
    PatientContext,
};
pub use renderer::ResponseRenderer;
pub use training::{
    DrugRecognitionAccuracy, FeedbackTracker, IntentAccuracy, OverallIntentAccuracy,
    TrainingInsights,
};

use pharmacy_assistant_persistence::PersistenceError;
use pharmacy_assistant_text_processing::ClassifierError;
use pharmacy_assistant_tools::KnowledgeError;
use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),
}
