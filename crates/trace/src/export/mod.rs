//! Span exporters and delivery sinks.
//!
//! An exporter turns a batch of closed spans into one JSON payload in a
//! backend's shape; a sink delivers that payload. Encoding is pure, so
//! every format is testable without a network.

mod console;
mod jaeger;
mod otlp;
mod sink;
mod zipkin;

use std::sync::Arc;

use {
    admitly_config::{ExporterType, TelemetryConfig},
    serde_json::Value,
};

pub use {
    console::ConsoleExporter,
    jaeger::JaegerExporter,
    otlp::OtlpExporter,
    sink::{ConsoleSink, HttpSink, SpanSink},
    zipkin::ZipkinExporter,
};

use crate::{error::Result, span::Span};

/// Identity of the emitting service, attached to every payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
}

impl Default for Resource {
    fn default() -> Self {
        Self {
            service_name: "ai-agent".into(),
            service_version: "1.0.0".into(),
            environment: "development".into(),
        }
    }
}

impl From<&TelemetryConfig> for Resource {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            service_name: config.service_name.clone(),
            service_version: config.service_version.clone(),
            environment: config.environment.clone(),
        }
    }
}

pub trait SpanExporter: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Encode a batch of closed spans.
    fn encode(&self, spans: &[Span]) -> Value;
}

/// Exporter for the configured backend.
pub fn exporter_for(kind: ExporterType, resource: Resource) -> Arc<dyn SpanExporter> {
    match kind {
        ExporterType::Console => Arc::new(ConsoleExporter),
        ExporterType::Jaeger => Arc::new(JaegerExporter::new(resource)),
        ExporterType::Zipkin => Arc::new(ZipkinExporter::new(resource)),
        ExporterType::Otlp => Arc::new(OtlpExporter::new(resource)),
    }
}

/// Sink matching the configured backend: stdout for console, HTTP POST to
/// the backend's endpoint otherwise.
pub fn sink_for(config: &TelemetryConfig) -> Result<Arc<dyn SpanSink>> {
    match config.exporter_endpoint() {
        Some(endpoint) => Ok(Arc::new(HttpSink::new(endpoint)?)),
        None => Ok(Arc::new(ConsoleSink)),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_matches_config() {
        for (kind, name) in [
            (ExporterType::Console, "console"),
            (ExporterType::Jaeger, "jaeger"),
            (ExporterType::Zipkin, "zipkin"),
            (ExporterType::Otlp, "otlp"),
        ] {
            assert_eq!(exporter_for(kind, Resource::default()).name(), name);
        }
    }

    #[test]
    fn resource_from_config() {
        let config = TelemetryConfig {
            service_name: "advisor".into(),
            ..TelemetryConfig::default()
        };
        let resource = Resource::from(&config);
        assert_eq!(resource.service_name, "advisor");
        assert_eq!(resource.environment, "development");
    }
}
