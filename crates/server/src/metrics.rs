//! Prometheus metrics
//!
//! The dispatcher records through the `metrics` facade; this module installs
//! the Prometheus recorder and renders it at `/metrics`.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Query latency buckets in seconds
const QUERY_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0];

/// Install the global Prometheus recorder
///
/// Returns `None` when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    let builder = match PrometheusBuilder::new().set_buckets_for_metric(
        metrics_exporter_prometheus::Matcher::Full("assistant_query_duration_seconds".to_string()),
        QUERY_DURATION_BUCKETS,
    ) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid histogram buckets, using summaries");
            PrometheusBuilder::new()
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            describe_metrics();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!(
        "assistant_queries_total",
        "Messages handled by the action assistant, by intent"
    );
    metrics::describe_counter!(
        "assistant_auth_required_total",
        "Replies that asked the caller to log in"
    );
    metrics::describe_histogram!(
        "assistant_query_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent handling one message"
    );
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics are disabled".to_string(),
        ),
    }
}
