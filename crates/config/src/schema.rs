//! Telemetry config schema (tracing exporter, sampling, metrics).

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub const DEFAULT_JAEGER_ENDPOINT: &str = "http://localhost:14268/api/traces";
pub const DEFAULT_ZIPKIN_ENDPOINT: &str = "http://localhost:9411/api/v2/spans";
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318/v1/traces";

/// Root telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether tracing is enabled. Defaults to true.
    pub enabled: bool,
    /// Reported as `service.name` on every exported span. Defaults to "ai-agent".
    pub service_name: String,
    /// Reported as `service.version`. Defaults to "1.0.0".
    pub service_version: String,
    /// Deployment environment (development, staging, production).
    pub environment: String,
    /// Which span exporter the flush cycle uses.
    pub exporter: ExporterType,
    /// Probability in `[0, 1]` that a new span is recorded.
    pub sampling_ratio: f64,
    /// Per-backend collector URLs.
    pub endpoints: EndpointsConfig,
    /// Seconds between buffer flushes. Defaults to 10.
    pub export_interval_secs: u64,
    /// How long closed spans stay in the trace buffer. Defaults to 300.
    pub retention_secs: u64,
    pub metrics: MetricsConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "ai-agent".into(),
            service_version: "1.0.0".into(),
            environment: "development".into(),
            exporter: ExporterType::default(),
            sampling_ratio: 1.0,
            endpoints: EndpointsConfig::default(),
            export_interval_secs: 10,
            retention_secs: 300,
            metrics: MetricsConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Collector URL for the configured exporter, `None` for console output.
    pub fn exporter_endpoint(&self) -> Option<&str> {
        match self.exporter {
            ExporterType::Console => None,
            ExporterType::Jaeger => Some(&self.endpoints.jaeger),
            ExporterType::Zipkin => Some(&self.endpoints.zipkin),
            ExporterType::Otlp => Some(&self.endpoints.otlp),
        }
    }

    /// Sampling ratio clamped into `[0, 1]`; NaN falls back to 1.0.
    pub fn effective_sampling_ratio(&self) -> f64 {
        if self.sampling_ratio.is_nan() {
            return 1.0;
        }
        self.sampling_ratio.clamp(0.0, 1.0)
    }
}

/// Span export backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterType {
    #[default]
    Console,
    Jaeger,
    Zipkin,
    Otlp,
}

impl fmt::Display for ExporterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Console => "console",
            Self::Jaeger => "jaeger",
            Self::Zipkin => "zipkin",
            Self::Otlp => "otlp",
        })
    }
}

impl FromStr for ExporterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "jaeger" => Ok(Self::Jaeger),
            "zipkin" => Ok(Self::Zipkin),
            "otlp" => Ok(Self::Otlp),
            other => Err(format!("unknown exporter type: {other}")),
        }
    }
}

/// Collector endpoints, one per remote exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub jaeger: String,
    pub zipkin: String,
    pub otlp: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            jaeger: DEFAULT_JAEGER_ENDPOINT.into(),
            zipkin: DEFAULT_ZIPKIN_ENDPOINT.into(),
            otlp: DEFAULT_OTLP_ENDPOINT.into(),
        }
    }
}

/// Metrics registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Prefix joined to every registered metric name with `_`.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Whether to expose the `/metrics` Prometheus endpoint.
    #[serde(default = "default_true")]
    pub prometheus_endpoint: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_prefix(),
            prometheus_endpoint: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    "ai_agent".into()
}
