//! Structured metric summary for JSON consumers.
//!
//! Unlike the text exposition, labels here are decoded back into a map so
//! dashboards never see the canonical key encoding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    /// Name used on the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

/// One label-set of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesSnapshot {
    Histogram {
        labels: BTreeMap<String, String>,
        sum: f64,
        count: u64,
        /// `sum / count`, or 0 when nothing was observed.
        mean: f64,
    },
    Value {
        labels: BTreeMap<String, String>,
        value: f64,
    },
}

impl SeriesSnapshot {
    pub fn labels(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Histogram { labels, .. } | Self::Value { labels, .. } => labels,
        }
    }

    /// Counter/gauge value; `None` for histograms.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value { value, .. } => Some(*value),
            Self::Histogram { .. } => None,
        }
    }
}

/// Full metric name → series.
pub type MetricsSummary = BTreeMap<String, Vec<SeriesSnapshot>>;
