//! Environment variable overrides applied on top of the file config.
//!
//! Unparseable values are logged and ignored; the previous value stays.

use std::str::FromStr;

use tracing::warn;

use crate::schema::{ExporterType, TelemetryConfig};

pub const TRACING_ENABLED: &str = "ADMITLY_TRACING_ENABLED";
pub const SERVICE_NAME: &str = "ADMITLY_SERVICE_NAME";
pub const SERVICE_VERSION: &str = "ADMITLY_SERVICE_VERSION";
pub const ENVIRONMENT: &str = "ADMITLY_ENVIRONMENT";
pub const TRACE_EXPORTER: &str = "ADMITLY_TRACE_EXPORTER";
pub const SAMPLING_RATIO: &str = "ADMITLY_SAMPLING_RATIO";
pub const JAEGER_ENDPOINT: &str = "ADMITLY_JAEGER_ENDPOINT";
pub const ZIPKIN_ENDPOINT: &str = "ADMITLY_ZIPKIN_ENDPOINT";
pub const OTLP_ENDPOINT: &str = "ADMITLY_OTLP_ENDPOINT";
pub const METRICS_PREFIX: &str = "ADMITLY_METRICS_PREFIX";
pub const METRICS_ENABLED: &str = "ADMITLY_METRICS_ENABLED";

/// Apply `ADMITLY_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut TelemetryConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides using a custom variable lookup.
pub fn apply_env_overrides_with(
    config: &mut TelemetryConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = text(TRACING_ENABLED) {
        parse_into(TRACING_ENABLED, &v, parse_bool, &mut config.enabled);
    }
    if let Some(v) = text(SERVICE_NAME) {
        config.service_name = v;
    }
    if let Some(v) = text(SERVICE_VERSION) {
        config.service_version = v;
    }
    if let Some(v) = text(ENVIRONMENT) {
        config.environment = v;
    }
    if let Some(v) = text(TRACE_EXPORTER) {
        parse_into(
            TRACE_EXPORTER,
            &v,
            |s| ExporterType::from_str(s).ok(),
            &mut config.exporter,
        );
    }
    if let Some(v) = text(SAMPLING_RATIO) {
        parse_into(
            SAMPLING_RATIO,
            &v,
            |s| s.trim().parse::<f64>().ok().filter(|r| r.is_finite()),
            &mut config.sampling_ratio,
        );
    }
    if let Some(v) = text(JAEGER_ENDPOINT) {
        config.endpoints.jaeger = v;
    }
    if let Some(v) = text(ZIPKIN_ENDPOINT) {
        config.endpoints.zipkin = v;
    }
    if let Some(v) = text(OTLP_ENDPOINT) {
        config.endpoints.otlp = v;
    }
    if let Some(v) = text(METRICS_PREFIX) {
        config.metrics.prefix = v;
    }
    if let Some(v) = text(METRICS_ENABLED) {
        parse_into(METRICS_ENABLED, &v, parse_bool, &mut config.metrics.enabled);
    }
}

fn parse_into<T>(key: &str, raw: &str, parse: impl Fn(&str) -> Option<T>, slot: &mut T) {
    match parse(raw) {
        Some(value) => *slot = value,
        None => warn!(key, value = raw, "ignoring unparseable telemetry override"),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
