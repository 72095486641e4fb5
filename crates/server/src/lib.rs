//! Pharmacy Assistant Server
//!
//! HTTP endpoints for the action assistant, the drug expert, feedback
//! analytics and the chat audit log.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use pharmacy_assistant_agent::AgentError;
use pharmacy_assistant_persistence::PersistenceError;
use pharmacy_assistant_tools::{KnowledgeError, SeedError};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Client-facing message, returned verbatim
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Startup data error: {0}")]
    Startup(String),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SeedError> for ServerError {
    fn from(err: SeedError) -> Self {
        ServerError::Startup(err.to_string())
    }
}

impl From<KnowledgeError> for ServerError {
    fn from(err: KnowledgeError) -> Self {
        ServerError::Startup(err.to_string())
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Agent(AgentError::InvalidFeedback(_)) => {
                axum::http::StatusCode::BAD_REQUEST
            }
            ServerError::Startup(_)
            | ServerError::Agent(_)
            | ServerError::Persistence(_)
            | ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        let status: axum::http::StatusCode = self.into();
        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        }
        (status, axum::Json(serde_json::json!({ "message": message }))).into_response()
    }
}
