//! Bridge from the `metrics` facade macros into a [`MetricRegistry`].
//!
//! `describe_*!` registers a metric (un-prefixed name, help text); `counter!`,
//! `gauge!` and `histogram!` handles then feed the registry with the same
//! silent no-op rules as direct calls.

use std::sync::Arc;

use {
    metrics::{
        Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata,
        Recorder, SharedString, Unit,
    },
    tracing::info,
};

use crate::{Error, Result, label_set::LabelKey, registry::MetricRegistry, snapshot::MetricType};

/// `metrics::Recorder` backed by a shared registry.
#[derive(Clone)]
pub struct MetricsRecorder {
    registry: Arc<MetricRegistry>,
}

impl MetricsRecorder {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self { registry }
    }

    /// Install as the process-global recorder. Call once at startup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecorderInstalled`] if a global recorder already exists.
    pub fn install(self) -> Result<()> {
        metrics::set_global_recorder(self).map_err(|_| Error::RecorderInstalled)?;
        info!("metrics facade recorder installed");
        Ok(())
    }

    fn handle(&self, key: &Key) -> Arc<SeriesHandle> {
        let labels: Vec<(&str, &str)> = key.labels().map(|l| (l.key(), l.value())).collect();
        Arc::new(SeriesHandle {
            registry: Arc::clone(&self.registry),
            name: key.name().to_string(),
            key: LabelKey::new(&labels),
        })
    }
}

impl Recorder for MetricsRecorder {
    fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.registry
            .describe(MetricType::Counter, key.as_str(), &description);
    }

    fn describe_gauge(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.registry
            .describe(MetricType::Gauge, key.as_str(), &description);
    }

    fn describe_histogram(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.registry
            .describe(MetricType::Histogram, key.as_str(), &description);
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.handle(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(self.handle(key))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(self.handle(key))
    }
}

/// One (metric, label-set) pair resolved once at handle creation.
struct SeriesHandle {
    registry: Arc<MetricRegistry>,
    name: String,
    key: LabelKey,
}

impl CounterFn for SeriesHandle {
    fn increment(&self, value: u64) {
        if self.registry.is_enabled() {
            self.registry
                .inc_counter_keyed(&self.name, self.key.clone(), value as f64);
        }
    }

    fn absolute(&self, value: u64) {
        if self.registry.is_enabled() {
            self.registry
                .absolute_counter_keyed(&self.name, self.key.clone(), value as f64);
        }
    }
}

impl GaugeFn for SeriesHandle {
    fn increment(&self, value: f64) {
        if self.registry.is_enabled() {
            self.registry
                .update_gauge_keyed(&self.name, self.key.clone(), |slot| *slot += value);
        }
    }

    fn decrement(&self, value: f64) {
        if self.registry.is_enabled() {
            self.registry
                .update_gauge_keyed(&self.name, self.key.clone(), |slot| *slot -= value);
        }
    }

    fn set(&self, value: f64) {
        if self.registry.is_enabled() {
            self.registry
                .update_gauge_keyed(&self.name, self.key.clone(), |slot| *slot = value);
        }
    }
}

impl HistogramFn for SeriesHandle {
    fn record(&self, value: f64) {
        if self.registry.is_enabled() {
            self.registry
                .observe_histogram_keyed(&self.name, self.key.clone(), value);
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facade_macros_feed_registry() {
        let registry = Arc::new(MetricRegistry::default());
        registry.register_counter("chat_messages_total", "Chat messages", &["direction"]);
        registry.register_histogram("llm_latency_seconds", "LLM latency", &[], Some(&[1.0, 5.0]));
        let recorder = MetricsRecorder::new(Arc::clone(&registry));

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("chat_messages_total", "direction" => "inbound").increment(2);
            metrics::counter!("chat_messages_total", "direction" => "inbound").increment(1);
            metrics::histogram!("llm_latency_seconds").record(0.4);
            metrics::gauge!("unregistered_gauge").set(1.0);
        });

        assert_eq!(
            registry.value("chat_messages_total", &[("direction", "inbound")]),
            Some(3.0)
        );
        assert_eq!(registry.histogram("llm_latency_seconds", &[]).unwrap().count, 1);
        assert_eq!(registry.swallowed_calls(), 1);
    }

    #[test]
    fn describe_registers_metric() {
        let registry = Arc::new(MetricRegistry::default());
        let recorder = MetricsRecorder::new(Arc::clone(&registry));

        metrics::with_local_recorder(&recorder, || {
            metrics::describe_gauge!("queue_depth", "Pending recommendation jobs");
            metrics::gauge!("queue_depth").increment(4.0);
            metrics::gauge!("queue_depth").decrement(1.0);
        });

        assert_eq!(registry.metric_type("queue_depth"), Some(MetricType::Gauge));
        assert_eq!(registry.value("queue_depth", &[]), Some(3.0));
        assert!(
            registry
                .export_text()
                .contains("# HELP ai_agent_queue_depth Pending recommendation jobs")
        );
    }

    #[test]
    fn absolute_counter_never_decreases() {
        let registry = Arc::new(MetricRegistry::default());
        registry.register_counter("bytes_total", "", &[]);
        let recorder = MetricsRecorder::new(Arc::clone(&registry));

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("bytes_total").absolute(10);
            metrics::counter!("bytes_total").absolute(4);
        });

        assert_eq!(registry.value("bytes_total", &[]), Some(10.0));
    }
}
