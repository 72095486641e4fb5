//! HTTP Endpoints
//!
//! REST API for the pharmacy assistant.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use pharmacy_assistant_config::constants::server::CORS_FALLBACK_ORIGIN;
use pharmacy_assistant_core::{AuthContext, CustomerId, FeedbackKind, FeedbackPayload};

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Audit records returned by `/api/chat/logs` when no limit is given
const DEFAULT_LOG_LIMIT: usize = 50;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let timeout = Duration::from_secs(config.server.timeout_seconds);
    drop(config);

    Router::new()
        // Action assistant
        .route("/api/chat/query", post(chat_query))
        .route(
            "/api/chat/context/:session_id",
            post(update_context).delete(clear_context),
        )
        // Drug expert
        .route("/api/chat/expert", post(expert_query))
        // Feedback and analytics
        .route("/api/chat/feedback", post(submit_feedback))
        .route("/api/chat/analytics", get(analytics))
        .route("/api/chat/analytics/intent-accuracy", get(intent_accuracy))
        .route("/api/chat/analytics/drug-recognition", get(drug_recognition))
        .route("/api/chat/analytics/ratings", get(average_ratings))
        .route("/api/chat/export", post(export_training_data))
        .route("/api/chat/import", post(import_training_data))
        .route("/api/chat/logs", get(chat_logs))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin endpoints
        .route("/admin/reload-config", post(reload_config))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty or all invalid, allows only the fallback origin
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", CORS_FALLBACK_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(CORS_FALLBACK_ORIGIN))
            .allow_methods(methods)
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods(methods)
        .allow_headers(Any)
}

/// Explicit session id, else the customer's own session, else the shared anonymous one
pub fn resolve_session_key(session_id: Option<&str>, customer_id: Option<CustomerId>) -> String {
    match (session_id.map(str::trim).filter(|s| !s.is_empty()), customer_id) {
        (Some(session_id), _) => session_id.to_string(),
        (None, Some(customer_id)) => format!("customer:{}", customer_id),
        (None, None) => "anonymous".to_string(),
    }
}

fn required_query(query: Option<String>) -> Result<String, ServerError> {
    query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("Query is required".to_string()))
}

#[derive(Debug, Deserialize)]
struct ChatQueryRequest {
    query: Option<String>,
    session_id: Option<String>,
    customer_id: Option<CustomerId>,
}

/// POST /api/chat/query
async fn chat_query(
    State(state): State<AppState>,
    Json(request): Json<ChatQueryRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let query = required_query(request.query)?;
    let session_key = resolve_session_key(request.session_id.as_deref(), request.customer_id);
    let auth = request.customer_id.map(AuthContext::customer);

    let result = state
        .dispatcher
        .handle_query(&query, &session_key, auth)
        .await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ExpertQueryRequest {
    query: Option<String>,
    session_id: Option<String>,
    user_id: Option<CustomerId>,
}

/// POST /api/chat/expert
async fn expert_query(
    State(state): State<AppState>,
    Json(request): Json<ExpertQueryRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let query = required_query(request.query)?;
    let session_key = resolve_session_key(request.session_id.as_deref(), request.user_id);

    let answer = state
        .expert
        .answer(&query, &session_key, request.user_id)
        .await?;
    Ok(Json(answer))
}

#[derive(Debug, Deserialize)]
struct ContextUpdateRequest {
    key: Option<String>,
    value: Option<serde_json::Value>,
}

/// POST /api/chat/context/:session_id
async fn update_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ContextUpdateRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let (key, value) = match (request.key, request.value) {
        (Some(key), Some(value)) if !key.is_empty() && !value.is_null() => (key, value),
        _ => {
            return Err(ServerError::InvalidRequest(
                "Key and value required".to_string(),
            ))
        }
    };

    let handle = state.contexts.acquire(&session_id).await;
    handle.lock().await.set_scratch(key, value);

    Ok(Json(serde_json::json!({ "message": "Context updated" })))
}

/// DELETE /api/chat/context/:session_id
async fn clear_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let existed = state.contexts.evict(&session_id).await;
    tracing::debug!(session = %session_id, existed, "Cleared conversation context");
    Json(serde_json::json!({ "message": "Context cleared" }))
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    log_id: Option<Uuid>,
    feedback_type: Option<String>,
    #[serde(default)]
    feedback_data: FeedbackPayload,
}

/// POST /api/chat/feedback
async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let (log_id, feedback_type) = match (request.log_id, request.feedback_type) {
        (Some(log_id), Some(feedback_type)) => (log_id, feedback_type),
        _ => {
            return Err(ServerError::InvalidRequest(
                "log_id and feedback_type are required".to_string(),
            ))
        }
    };
    let kind = FeedbackKind::from_str(&feedback_type).map_err(ServerError::InvalidRequest)?;

    state
        .tracker
        .record_feedback(log_id, kind, request.feedback_data)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Feedback recorded successfully",
        "log_id": log_id,
    })))
}

#[derive(Debug, Deserialize)]
struct IntentFilter {
    intent: Option<String>,
}

impl IntentFilter {
    fn intent(&self) -> Option<&str> {
        self.intent.as_deref().filter(|i| !i.is_empty())
    }
}

/// GET /api/chat/analytics
async fn analytics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tracker.insights())
}

/// GET /api/chat/analytics/intent-accuracy
///
/// One intent when `?intent=` is given, otherwise the overall breakdown.
async fn intent_accuracy(
    State(state): State<AppState>,
    Query(filter): Query<IntentFilter>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let body = match filter.intent() {
        Some(intent) => serde_json::to_value(state.tracker.intent_accuracy(intent)),
        None => serde_json::to_value(state.tracker.overall_intent_accuracy()),
    }
    .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(body))
}

/// GET /api/chat/analytics/drug-recognition
async fn drug_recognition(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tracker.drug_recognition_accuracy())
}

/// GET /api/chat/analytics/ratings
async fn average_ratings(
    State(state): State<AppState>,
    Query(filter): Query<IntentFilter>,
) -> impl IntoResponse {
    let intent = filter.intent();
    Json(serde_json::json!({
        "intent": intent.unwrap_or("all"),
        "average_rating": state.tracker.average_rating(intent),
    }))
}

/// POST /api/chat/export
async fn export_training_data(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
    let path = state.tracker.export(None).await?;
    Ok(Json(serde_json::json!({
        "message": "Training data exported successfully",
        "filepath": path.display().to_string(),
    })))
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    filepath: Option<String>,
}

/// POST /api/chat/import
async fn import_training_data(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let filepath = request
        .filepath
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("filepath is required".to_string()))?;

    state.tracker.import(&filepath).await?;
    Ok(Json(serde_json::json!({
        "message": "Training data imported successfully",
    })))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

/// GET /api/chat/logs
async fn chat_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let records = state
        .audit
        .recent(params.limit.unwrap_or(DEFAULT_LOG_LIMIT))
        .await?;
    Ok(Json(records))
}

/// Health check covering the audit log and the context store
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();

    let audit_ok = match state.audit.recent(1).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Audit log health check failed");
            false
        }
    };
    checks.insert(
        "audit_log".to_string(),
        serde_json::json!({ "status": if audit_ok { "ok" } else { "error" } }),
    );
    checks.insert(
        "contexts".to_string(),
        serde_json::json!({ "status": "ok", "count": state.contexts.len() }),
    );
    checks.insert(
        "metrics".to_string(),
        serde_json::json!({
            "status": if state.metrics.is_some() { "ok" } else { "disabled" }
        }),
    );

    let (status, status_code) = if audit_ok {
        ("healthy", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": status,
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks
        })),
    )
}

/// Config reload endpoint
///
/// POST /admin/reload-config
///
/// Note: CORS, timeouts and assistant settings are only applied at startup.
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Configuration reloaded successfully"
            })),
        ),
        Err(e) => {
            tracing::error!("Config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_prefers_explicit_session() {
        assert_eq!(resolve_session_key(Some("abc"), Some(7)), "abc");
        assert_eq!(resolve_session_key(Some("  "), Some(7)), "customer:7");
        assert_eq!(resolve_session_key(None, Some(7)), "customer:7");
        assert_eq!(resolve_session_key(None, None), "anonymous");
    }

    #[test]
    fn test_required_query_rejects_blank() {
        assert!(required_query(None).is_err());
        assert!(required_query(Some("   ".to_string())).is_err());
        assert_eq!(required_query(Some("hi".to_string())).unwrap(), "hi");
    }

    #[test]
    fn test_cors_layer_falls_back_on_invalid_origins() {
        let _ = build_cors_layer(&["not a header\n".to_string()], true);
        let _ = build_cors_layer(&[], false);
    }
}
