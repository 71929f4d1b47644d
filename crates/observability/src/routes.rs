//! Metrics and trace lookup routes.

use std::sync::Arc;

use {
    admitly_metrics::TEXT_CONTENT_TYPE,
    admitly_trace::export::ConsoleExporter,
    axum::{
        Json, Router,
        extract::{Path, State},
        http::{StatusCode, header},
        middleware,
        response::{IntoResponse, Response},
        routing::get,
    },
    serde_json::json,
};

use crate::{middleware::http_telemetry_middleware, observability::Observability};

/// `/metrics`, `/api/metrics` and `/api/traces/{trace_id}`, wrapped in the
/// request telemetry middleware.
pub fn router(obs: Arc<Observability>) -> Router {
    Router::new()
        .route("/metrics", get(prometheus_metrics_handler))
        .route("/api/metrics", get(api_metrics_handler))
        .route("/api/traces/{trace_id}", get(trace_handler))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&obs),
            http_telemetry_middleware,
        ))
        .with_state(obs)
}

/// Text exposition for Prometheus-compatible scrapers. Unauthenticated.
pub async fn prometheus_metrics_handler(State(obs): State<Arc<Observability>>) -> Response {
    if !obs.registry().is_enabled() || !obs.config().metrics.prometheus_endpoint {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not enabled",
        )
            .into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        obs.export_text(),
    )
        .into_response()
}

/// Structured metrics summary as JSON.
pub async fn api_metrics_handler(State(obs): State<Arc<Observability>>) -> Response {
    if !obs.registry().is_enabled() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Metrics not enabled" })),
        )
            .into_response();
    }
    Json(obs.export_structured()).into_response()
}

/// Buffered spans of one trace, in console summary shape.
pub async fn trace_handler(
    State(obs): State<Arc<Observability>>,
    Path(trace_id): Path<String>,
) -> Response {
    let spans = obs.tracer().get_trace(&trace_id);
    if spans.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "trace not found", "traceId": trace_id })),
        )
            .into_response();
    }
    Json(json!({
        "traceId": trace_id,
        "spanCount": spans.len(),
        "spans": spans.iter().map(ConsoleExporter::span_summary).collect::<Vec<_>>(),
    }))
    .into_response()
}
