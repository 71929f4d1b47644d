//! Metric names, label keys and bucket presets used across the platform.
//!
//! Names are un-prefixed; the registry joins its configured prefix on
//! registration. [`register_defaults`] registers every metric listed here.

use crate::registry::MetricRegistry;

/// HTTP request metrics
pub mod http {
    /// Total number of HTTP requests handled
    pub const REQUESTS_TOTAL: &str = "http_requests_total";
    /// Duration of HTTP requests in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
    /// Number of currently in-flight HTTP requests
    pub const REQUESTS_IN_FLIGHT: &str = "http_requests_in_flight";
}

/// Agent request metrics (one request = one advisor conversation turn)
pub mod agent {
    /// Total agent requests by agent and outcome
    pub const REQUESTS_TOTAL: &str = "agent_requests_total";
    /// Agent request duration in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "agent_request_duration_seconds";
    /// Agent requests currently being processed
    pub const REQUESTS_ACTIVE: &str = "agent_requests_active";
}

/// LLM metrics
pub mod llm {
    /// Total LLM calls by provider, model and status
    pub const CALLS_TOTAL: &str = "llm_calls_total";
    /// LLM call latency in seconds
    pub const LATENCY_SECONDS: &str = "llm_latency_seconds";
    /// Tokens consumed, labelled by direction (input/output)
    pub const TOKENS_TOTAL: &str = "llm_tokens_total";
}

/// Tool execution metrics
pub mod tools {
    pub const CALLS_TOTAL: &str = "tool_calls_total";
    pub const DURATION_SECONDS: &str = "tool_duration_seconds";
}

/// Chat metrics
pub mod chat {
    /// Chat messages by direction (inbound/outbound)
    pub const MESSAGES_TOTAL: &str = "chat_messages_total";
}

/// College recommendation metrics
pub mod recommendations {
    /// Recommendations generated, by kind (reach/match/safety)
    pub const GENERATED_TOTAL: &str = "recommendations_generated_total";
}

/// Payment metrics
pub mod payments {
    /// Payment attempts by status
    pub const TOTAL: &str = "payments_total";
    /// Payment amounts in the account currency
    pub const AMOUNT: &str = "payment_amount";
}

/// Common label keys
pub mod labels {
    pub const AGENT: &str = "agent";
    pub const DIRECTION: &str = "direction";
    pub const ENDPOINT: &str = "endpoint";
    pub const KIND: &str = "kind";
    pub const METHOD: &str = "method";
    pub const MODEL: &str = "model";
    pub const PROVIDER: &str = "provider";
    pub const STATUS: &str = "status";
    pub const TOOL: &str = "tool";
}

/// Standard histogram buckets
pub mod buckets {
    use once_cell::sync::Lazy;

    /// HTTP request duration (seconds), 1ms to 60s
    pub static HTTP_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// LLM call latency (seconds); calls can be slow, up to 5 minutes
    pub static LLM_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0,
        ]
    });

    /// Tool execution (seconds)
    pub static TOOL_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0,
        ]
    });

    /// Payment amounts (currency units)
    pub static PAYMENT_AMOUNT: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0,
        ]
    });
}

/// Register every platform metric on `registry`.
pub fn register_defaults(registry: &MetricRegistry) {
    use labels::*;

    registry.register_counter(http::REQUESTS_TOTAL, "Total HTTP requests", &[
        ENDPOINT, METHOD, STATUS,
    ]);
    registry.register_histogram(
        http::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds",
        &[ENDPOINT, METHOD],
        Some(buckets::HTTP_DURATION.as_slice()),
    );
    registry.register_gauge(http::REQUESTS_IN_FLIGHT, "In-flight HTTP requests", &[
        ENDPOINT,
    ]);

    registry.register_counter(agent::REQUESTS_TOTAL, "Total agent requests", &[
        AGENT, STATUS,
    ]);
    registry.register_histogram(
        agent::REQUEST_DURATION_SECONDS,
        "Agent request duration in seconds",
        &[AGENT],
        Some(buckets::LLM_DURATION.as_slice()),
    );
    registry.register_gauge(
        agent::REQUESTS_ACTIVE,
        "Agent requests currently in progress",
        &[AGENT],
    );

    registry.register_counter(llm::CALLS_TOTAL, "Total LLM calls", &[
        PROVIDER, MODEL, STATUS,
    ]);
    registry.register_histogram(
        llm::LATENCY_SECONDS,
        "LLM call latency in seconds",
        &[PROVIDER, MODEL],
        Some(buckets::LLM_DURATION.as_slice()),
    );
    registry.register_counter(llm::TOKENS_TOTAL, "LLM tokens consumed", &[
        PROVIDER, MODEL, DIRECTION,
    ]);

    registry.register_counter(tools::CALLS_TOTAL, "Total tool calls", &[TOOL, STATUS]);
    registry.register_histogram(
        tools::DURATION_SECONDS,
        "Tool execution duration in seconds",
        &[TOOL],
        Some(buckets::TOOL_DURATION.as_slice()),
    );

    registry.register_counter(chat::MESSAGES_TOTAL, "Chat messages", &[DIRECTION]);
    registry.register_counter(
        recommendations::GENERATED_TOTAL,
        "College recommendations generated",
        &[KIND],
    );
    registry.register_counter(payments::TOTAL, "Payment attempts", &[STATUS]);
    registry.register_histogram(
        payments::AMOUNT,
        "Payment amounts",
        &[STATUS],
        Some(buckets::PAYMENT_AMOUNT.as_slice()),
    );
}
