//! Prometheus-style text exposition.

use std::fmt::Write;

use crate::{
    label_set::LabelKey,
    registry::{MetricData, MetricRegistry},
};

/// `Content-Type` for [`MetricRegistry::export_text`] payloads.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Short name of the diagnostic counter of swallowed observation calls.
pub const SWALLOWED_METRIC: &str = "metrics_swallowed_total";

impl MetricRegistry {
    /// Render every metric in registration order:
    ///
    /// ```text
    /// # HELP ai_agent_requests_total Total requests
    /// # TYPE ai_agent_requests_total counter
    /// ai_agent_requests_total{status="success"} 3
    /// ```
    ///
    /// Histograms emit one `_bucket` line per threshold, a synthetic
    /// `le="+Inf"` bucket equal to the count, then `_sum` and `_count`.
    pub fn export_text(&self) -> String {
        let mut out = String::new();
        let state = self.read();

        for name in &state.order {
            let Some(metric) = state.metrics.get(name) else {
                continue;
            };
            let full = &metric.full_name;
            let kind = metric.data.kind();
            let _ = writeln!(out, "# HELP {full} {}", metric.help);
            let _ = writeln!(out, "# TYPE {full} {}", kind.as_str());

            match &metric.data {
                MetricData::Counter(values) | MetricData::Gauge(values) => {
                    for (key, value) in values {
                        let _ = writeln!(out, "{full}{} {value}", braces(key));
                    }
                },
                MetricData::Histogram { thresholds, series } => {
                    for (key, h) in series {
                        for (le, count) in thresholds.iter().zip(&h.buckets) {
                            let _ = writeln!(
                                out,
                                "{full}_bucket{} {count}",
                                with_le(key, &le.to_string())
                            );
                        }
                        let _ = writeln!(out, "{full}_bucket{} {}", with_le(key, "+Inf"), h.count);
                        let _ = writeln!(out, "{full}_sum{} {}", braces(key), h.sum);
                        let _ = writeln!(out, "{full}_count{} {}", braces(key), h.count);
                    }
                },
            }
        }
        drop(state);

        let swallowed = self.swallowed_calls();
        if swallowed > 0 {
            let full = self.full_name(SWALLOWED_METRIC);
            let _ = writeln!(
                out,
                "# HELP {full} Metric calls dropped for an unknown name, kind mismatch or invalid value"
            );
            let _ = writeln!(out, "# TYPE {full} counter");
            let _ = writeln!(out, "{full} {swallowed}");
        }

        out
    }
}

fn braces(key: &LabelKey) -> String {
    if key.is_empty() {
        String::new()
    } else {
        format!("{{{key}}}")
    }
}

fn with_le(key: &LabelKey, le: &str) -> String {
    if key.is_empty() {
        format!("{{le=\"{le}\"}}")
    } else {
        format!("{{{key},le=\"{le}\"}}")
    }
}
