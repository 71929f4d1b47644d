//! HTTP request telemetry middleware.
//!
//! Every request gets a SERVER span (parented on an inbound `traceparent`
//! when present) and feeds the HTTP metrics:
//! - `http_requests_total` by endpoint, method and status
//! - `http_request_duration_seconds` by endpoint and method
//! - `http_requests_in_flight` by endpoint
//!
//! The response carries a `traceparent` header for the request span.

use std::{sync::Arc, time::Instant};

use {
    admitly_metrics::{MetricRegistry, http as http_metrics, labels},
    admitly_trace::{SpanKind, SpanStatus, inject_headers},
    axum::{
        body::Body,
        extract::State,
        http::Request,
        middleware::Next,
        response::Response,
    },
};

use crate::observability::Observability;

/// Holds one `http_requests_in_flight` slot for an endpoint. Released on
/// drop, so a request future cancelled by a client disconnect still gives
/// its slot back.
struct InFlightGuard<'a> {
    registry: &'a MetricRegistry,
    endpoint: &'a str,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(registry: &'a MetricRegistry, endpoint: &'a str) -> Self {
        registry.inc_gauge(http_metrics::REQUESTS_IN_FLIGHT, 1.0, &[(
            labels::ENDPOINT,
            endpoint,
        )]);
        Self { registry, endpoint }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .dec_gauge(http_metrics::REQUESTS_IN_FLIGHT, 1.0, &[(
                labels::ENDPOINT,
                self.endpoint,
            )]);
    }
}

pub async fn http_telemetry_middleware(
    State(obs): State<Arc<Observability>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_path(request.uri().path());

    let mut span = obs.start_span_from_headers(format!("{method} {endpoint}"), request.headers());
    span.set_kind(SpanKind::Server)
        .set_attribute("http.method", method.as_str())
        .set_attribute("http.route", endpoint.as_str());

    let registry = obs.registry();
    let in_flight = InFlightGuard::acquire(registry, &endpoint);

    let mut response = next.run(request).await;

    let status = response.status();
    span.set_attribute("http.status_code", i64::from(status.as_u16()));
    if status.is_server_error() {
        span.set_status(SpanStatus::Error, status.canonical_reason());
    } else {
        span.set_status(SpanStatus::Ok, None);
    }
    inject_headers(span.context(), response.headers_mut());
    span.end();

    drop(in_flight);
    registry.inc_counter(
        http_metrics::REQUESTS_TOTAL,
        &[
            (labels::ENDPOINT, endpoint.as_str()),
            (labels::METHOD, method.as_str()),
            (labels::STATUS, status.as_str()),
        ],
        1.0,
    );
    registry.observe_histogram(
        http_metrics::REQUEST_DURATION_SECONDS,
        start.elapsed().as_secs_f64(),
        &[
            (labels::ENDPOINT, endpoint.as_str()),
            (labels::METHOD, method.as_str()),
        ],
    );

    response
}

/// Replace dynamic path segments (UUIDs, trace ids, numeric ids) with
/// `{id}` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    let normalized = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let is_dynamic = looks_like_id(segment)
                || segment.chars().all(|c| c.is_ascii_digit());
            if is_dynamic { "{id}" } else { segment }
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("/{normalized}")
}

/// UUIDs (dashed or compact) and 16/32-char hex span and trace ids.
fn looks_like_id(s: &str) -> bool {
    match s.len() {
        36 => {
            let parts: Vec<&str> = s.split('-').collect();
            parts.len() == 5
                && parts.iter().map(|p| p.len()).eq([8, 4, 4, 4, 12])
                && s.chars()
                    .filter(|c| *c != '-')
                    .all(|c| c.is_ascii_hexdigit())
        },
        16 | 32 => s.chars().all(|c| c.is_ascii_hexdigit()),
        _ => false,
    }
}
