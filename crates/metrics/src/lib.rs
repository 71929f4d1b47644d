//! Metric registry for admitly.
//!
//! Counters, gauges and histograms keyed by name and canonical label-set,
//! rendered as Prometheus-style text or as a structured JSON summary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use admitly_metrics::MetricRegistry;
//!
//! let registry = MetricRegistry::new("ai_agent", true);
//! registry.register_counter("requests_total", "Total requests", &["status"]);
//! registry.inc_counter("requests_total", &[("status", "success")], 1.0);
//! assert!(registry.export_text().contains(r#"ai_agent_requests_total{status="success"} 1"#));
//! ```
//!
//! Code written against the `metrics` facade macros can feed the same
//! registry through [`MetricsRecorder`].

mod definitions;
mod error;
mod exposition;
pub mod label_set;
mod recorder;
mod registry;
mod snapshot;

pub use {
    definitions::*,
    error::{Error, Result},
    exposition::{SWALLOWED_METRIC, TEXT_CONTENT_TYPE},
    label_set::LabelKey,
    recorder::MetricsRecorder,
    registry::{DEFAULT_BUCKETS, HistogramSeries, MetricRegistry},
    snapshot::{MetricType, MetricsSummary, SeriesSnapshot},
};
