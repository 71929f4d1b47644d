//! Instrumentation helpers for the advisor agents.
//!
//! Each helper feeds the platform metrics registered by
//! [`admitly_metrics::register_defaults`] with pre-set labels so call sites
//! stay one line.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    admitly_metrics::{MetricRegistry, agent, chat, labels, llm, payments, recommendations, tools},
    admitly_trace::{SpanBuilder, SpanContext, SpanKind, SpanStatus, Tracer},
    tracing::debug,
};

/// How an agent request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure(String),
}

impl RequestOutcome {
    fn status_label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure(_) => "error",
        }
    }
}

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "error" }
}

/// An in-flight agent request: its server span plus bookkeeping for the
/// request metrics.
#[derive(Debug)]
pub struct AgentRequest {
    request_id: String,
    agent: String,
    span: SpanBuilder,
    started: Instant,
}

impl AgentRequest {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn context(&self) -> &SpanContext {
        self.span.context()
    }

    /// The request span, for attributes and events.
    pub fn span_mut(&mut self) -> &mut SpanBuilder {
        &mut self.span
    }
}

#[derive(Debug, Clone)]
pub struct AgentTelemetry {
    registry: Arc<MetricRegistry>,
    tracer: Tracer,
}

impl AgentTelemetry {
    pub fn new(registry: Arc<MetricRegistry>, tracer: Tracer) -> Self {
        Self { registry, tracer }
    }

    /// Open the SERVER span for a request, register it as the request's
    /// active span and bump the in-flight gauge.
    pub fn start_agent_request(
        &self,
        request_id: &str,
        agent_name: &str,
        parent: Option<&SpanContext>,
    ) -> AgentRequest {
        let mut span = self.tracer.start_span("agent.request", parent);
        span.set_kind(SpanKind::Server)
            .set_attribute("agent.name", agent_name)
            .set_attribute("request.id", request_id);
        self.tracer
            .set_active_span(request_id, span.context().clone());
        self.registry
            .inc_gauge(agent::REQUESTS_ACTIVE, 1.0, &[(labels::AGENT, agent_name)]);
        debug!(request_id, agent = agent_name, "agent request started");

        AgentRequest {
            request_id: request_id.to_string(),
            agent: agent_name.to_string(),
            span,
            started: Instant::now(),
        }
    }

    /// Close the request span and record its outcome and duration.
    pub fn finish_agent_request(&self, request: AgentRequest, outcome: RequestOutcome) {
        let AgentRequest {
            request_id,
            agent: agent_name,
            mut span,
            started,
        } = request;
        match &outcome {
            RequestOutcome::Success => {
                span.set_status(SpanStatus::Ok, None);
            },
            RequestOutcome::Failure(message) => {
                span.set_status(SpanStatus::Error, Some(message.as_str()));
            },
        }
        span.end();
        self.tracer.clear_active_span(&request_id);

        let agent_label = [(labels::AGENT, agent_name.as_str())];
        self.registry
            .dec_gauge(agent::REQUESTS_ACTIVE, 1.0, &agent_label);
        self.registry.inc_counter(
            agent::REQUESTS_TOTAL,
            &[
                (labels::AGENT, agent_name.as_str()),
                (labels::STATUS, outcome.status_label()),
            ],
            1.0,
        );
        self.registry.observe_histogram(
            agent::REQUEST_DURATION_SECONDS,
            started.elapsed().as_secs_f64(),
            &agent_label,
        );
        debug!(
            request_id,
            agent = %agent_name,
            status = outcome.status_label(),
            "agent request finished"
        );
    }

    pub fn record_llm_call(
        &self,
        provider: &str,
        model: &str,
        latency: Duration,
        input_tokens: u64,
        output_tokens: u64,
        success: bool,
    ) {
        let target = [(labels::PROVIDER, provider), (labels::MODEL, model)];
        self.registry.inc_counter(
            llm::CALLS_TOTAL,
            &[
                (labels::PROVIDER, provider),
                (labels::MODEL, model),
                (labels::STATUS, status_label(success)),
            ],
            1.0,
        );
        self.registry
            .observe_histogram(llm::LATENCY_SECONDS, latency.as_secs_f64(), &target);
        for (direction, tokens) in [("input", input_tokens), ("output", output_tokens)] {
            self.registry.inc_counter(
                llm::TOKENS_TOTAL,
                &[
                    (labels::PROVIDER, provider),
                    (labels::MODEL, model),
                    (labels::DIRECTION, direction),
                ],
                tokens as f64,
            );
        }
    }

    pub fn record_tool_call(&self, tool: &str, latency: Duration, success: bool) {
        self.registry.inc_counter(
            tools::CALLS_TOTAL,
            &[(labels::TOOL, tool), (labels::STATUS, status_label(success))],
            1.0,
        );
        self.registry.observe_histogram(
            tools::DURATION_SECONDS,
            latency.as_secs_f64(),
            &[(labels::TOOL, tool)],
        );
    }

    /// `direction` is `inbound` or `outbound`.
    pub fn record_chat_message(&self, direction: &str) {
        self.registry
            .inc_counter(chat::MESSAGES_TOTAL, &[(labels::DIRECTION, direction)], 1.0);
    }

    /// `kind` is the recommendation tier, e.g. `reach`, `match`, `safety`.
    pub fn record_recommendation(&self, kind: &str) {
        self.registry.inc_counter(
            recommendations::GENERATED_TOTAL,
            &[(labels::KIND, kind)],
            1.0,
        );
    }

    pub fn record_payment(&self, status: &str, amount: f64) {
        let by_status = [(labels::STATUS, status)];
        self.registry.inc_counter(payments::TOTAL, &by_status, 1.0);
        self.registry
            .observe_histogram(payments::AMOUNT, amount, &by_status);
    }
}
