#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    admitly_config::TelemetryConfig,
    admitly_observability::{
        Observability, middleware::http_telemetry_middleware, routes::router,
    },
    admitly_trace::{SpanSink, parse_traceparent},
    async_trait::async_trait,
    axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::get as get_route,
    },
    serde_json::Value,
    tower::ServiceExt,
};

struct NullSink;

#[async_trait]
impl SpanSink for NullSink {
    async fn deliver(&self, _payload: &Value) -> admitly_trace::Result<()> {
        Ok(())
    }
}

fn observability(config: TelemetryConfig) -> Arc<Observability> {
    Arc::new(Observability::with_sink(config, Arc::new(NullSink)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn metrics_endpoint_serves_text_exposition() {
    let obs = observability(TelemetryConfig::default());
    obs.registry()
        .register_counter("requests_total", "Total requests", &["status"]);
    for _ in 0..3 {
        obs.inc_counter("requests_total", &[("status", "success")], 1.0);
    }
    obs.inc_counter("requests_total", &[("status", "error")], 1.0);

    let resp = router(Arc::clone(&obs)).oneshot(get("/metrics")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let text = body_text(resp).await;
    assert!(text.contains("# HELP ai_agent_requests_total Total requests\n"), "got: {text}");
    assert!(text.contains("# TYPE ai_agent_requests_total counter\n"));
    assert!(text.contains("ai_agent_requests_total{status=\"success\"} 3\n"));
    assert!(text.contains("ai_agent_requests_total{status=\"error\"} 1\n"));
    assert!(text.contains("# TYPE ai_agent_llm_latency_seconds histogram\n"));
}

#[tokio::test]
async fn metrics_endpoint_unavailable_when_disabled() {
    let mut config = TelemetryConfig::default();
    config.metrics.enabled = false;
    let obs = observability(config);

    let resp = router(Arc::clone(&obs)).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = router(obs).oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn api_metrics_returns_structured_summary() {
    let obs = observability(TelemetryConfig::default());
    obs.agent().record_chat_message("inbound");
    obs.agent().record_llm_call(
        "anthropic",
        "claude",
        Duration::from_millis(800),
        100,
        20,
        true,
    );

    let resp = router(Arc::clone(&obs)).oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(resp).await).unwrap();

    let chat = json["ai_agent_chat_messages_total"].as_array().unwrap();
    assert_eq!(chat[0]["labels"]["direction"], "inbound");
    assert_eq!(chat[0]["value"], 1.0);

    let latency = &json["ai_agent_llm_latency_seconds"][0];
    assert_eq!(latency["count"], 1);
    assert_eq!(latency["labels"]["model"], "claude");
}

#[tokio::test]
async fn trace_lookup_returns_buffered_spans() {
    let obs = observability(TelemetryConfig::default());
    let root = obs.start_span("agent.request", None);
    let trace_id = root.context().trace_id.clone();
    obs.start_span("llm.call", Some(root.context())).end();
    root.end();

    let resp = router(Arc::clone(&obs))
        .oneshot(get(&format!("/api/traces/{trace_id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["traceId"], trace_id.as_str());
    assert_eq!(json["spanCount"], 2);

    let resp = router(obs)
        .oneshot(get("/api/traces/00000000000000000000000000000001"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn middleware_continues_inbound_trace_and_counts_requests() {
    let obs = observability(TelemetryConfig::default());
    let request = Request::builder()
        .uri("/api/metrics")
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .body(Body::empty())
        .unwrap();

    let resp = router(Arc::clone(&obs)).oneshot(request).await.unwrap();

    let outbound = resp
        .headers()
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_traceparent)
        .unwrap();
    assert_eq!(outbound.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");

    let spans = obs.tracer().get_trace("4bf92f3577b34da6a3ce929d0e0e4736");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "GET /api/metrics");
    assert_eq!(
        spans[0].context.parent_span_id.as_deref(),
        Some("00f067aa0ba902b7")
    );

    assert_eq!(
        obs.registry().value("http_requests_total", &[
            ("endpoint", "/api/metrics"),
            ("method", "GET"),
            ("status", "200"),
        ]),
        Some(1.0)
    );
    assert_eq!(
        obs.registry()
            .value("http_requests_in_flight", &[("endpoint", "/api/metrics")]),
        Some(0.0)
    );
}

#[tokio::test]
async fn cancelled_request_releases_in_flight_slot() {
    let obs = observability(TelemetryConfig::default());
    let app = Router::new()
        .route(
            "/slow",
            get_route(|| std::future::pending::<&'static str>()),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&obs),
            http_telemetry_middleware,
        ));

    let outcome = tokio::time::timeout(Duration::from_millis(50), app.oneshot(get("/slow"))).await;
    assert!(outcome.is_err(), "handler should still be pending");

    assert_eq!(
        obs.registry()
            .value("http_requests_in_flight", &[("endpoint", "/slow")]),
        Some(0.0)
    );
    assert_eq!(
        obs.registry().value("http_requests_total", &[
            ("endpoint", "/slow"),
            ("method", "GET"),
            ("status", "200"),
        ]),
        None
    );
}

#[tokio::test]
async fn shutdown_flushes_without_worker() {
    let obs = observability(TelemetryConfig::default());
    obs.start_span("late", None).end();
    let report = obs.flush().await;
    assert_eq!(report.exported, 1);
    assert!(report.delivered);
    obs.shutdown().await;
}
