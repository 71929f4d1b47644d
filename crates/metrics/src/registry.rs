//! The metric registry: definitions plus per-label-set accumulators.
//!
//! Observation calls never fail. An unknown name, a kind mismatch or an
//! invalid value is swallowed and counted in [`MetricRegistry::swallowed_calls`];
//! a disabled registry returns after a single flag check.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tracing::{debug, trace};

use crate::{
    label_set::LabelKey,
    snapshot::{MetricType, MetricsSummary, SeriesSnapshot},
};

/// Prometheus client default buckets, used when a histogram is registered
/// without explicit thresholds.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Accumulated state of one histogram label-set.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub sum: f64,
    pub count: u64,
    /// `buckets[i]` counts observations `<= thresholds[i]`.
    pub buckets: Vec<u64>,
}

impl HistogramSeries {
    fn new(bucket_count: usize) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            buckets: vec![0; bucket_count],
        }
    }

    fn observe(&mut self, thresholds: &[f64], value: f64) {
        self.sum += value;
        self.count += 1;
        for (slot, le) in self.buckets.iter_mut().zip(thresholds) {
            if value <= *le {
                *slot += 1;
            }
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub(crate) enum MetricData {
    Counter(BTreeMap<LabelKey, f64>),
    Gauge(BTreeMap<LabelKey, f64>),
    Histogram {
        thresholds: Vec<f64>,
        series: BTreeMap<LabelKey, HistogramSeries>,
    },
}

impl MetricData {
    pub(crate) fn kind(&self) -> MetricType {
        match self {
            Self::Counter(_) => MetricType::Counter,
            Self::Gauge(_) => MetricType::Gauge,
            Self::Histogram { .. } => MetricType::Histogram,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Metric {
    /// Prefixed name as exported.
    pub(crate) full_name: String,
    pub(crate) help: String,
    /// Declared label names. Informational only; observations are not checked
    /// against them.
    pub(crate) label_names: Vec<String>,
    pub(crate) data: MetricData,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// Short names in registration order.
    pub(crate) order: Vec<String>,
    pub(crate) metrics: HashMap<String, Metric>,
}

/// Process-wide metric store.
///
/// Construct one at startup and share it behind an `Arc`.
#[derive(Debug)]
pub struct MetricRegistry {
    prefix: String,
    enabled: AtomicBool,
    swallowed: AtomicU64,
    state: RwLock<RegistryState>,
}

impl MetricRegistry {
    pub fn new(prefix: impl Into<String>, enabled: bool) -> Self {
        Self {
            prefix: prefix.into(),
            enabled: AtomicBool::new(enabled),
            swallowed: AtomicU64::new(0),
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Number of observation calls dropped because of an unknown name, a
    /// kind mismatch or an invalid value.
    pub fn swallowed_calls(&self) -> u64 {
        self.swallowed.load(Ordering::Relaxed)
    }

    /// Exported name for a short metric name.
    pub fn full_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{name}", self.prefix)
        }
    }

    // ── Registration ────────────────────────────────────────────────────────

    pub fn register_counter(&self, name: &str, help: &str, label_names: &[&str]) {
        self.register(
            name,
            help,
            label_names,
            MetricData::Counter(BTreeMap::new()),
        );
    }

    pub fn register_gauge(&self, name: &str, help: &str, label_names: &[&str]) {
        self.register(name, help, label_names, MetricData::Gauge(BTreeMap::new()));
    }

    /// Register a histogram. `buckets` are sorted ascending and deduplicated;
    /// non-finite thresholds are dropped. `None` uses [`DEFAULT_BUCKETS`].
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) {
        let mut thresholds: Vec<f64> = buckets
            .unwrap_or(DEFAULT_BUCKETS)
            .iter()
            .copied()
            .filter(|b| b.is_finite())
            .collect();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();

        self.register(name, help, label_names, MetricData::Histogram {
            thresholds,
            series: BTreeMap::new(),
        });
    }

    /// Re-registering a name replaces its definition and values but keeps its
    /// position in the export order.
    fn register(&self, name: &str, help: &str, label_names: &[&str], data: MetricData) {
        let metric = Metric {
            full_name: self.full_name(name),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| (*l).to_string()).collect(),
            data,
        };
        let kind = metric.data.kind();

        let mut state = self.write();
        if state.metrics.insert(name.to_string(), metric).is_some() {
            debug!(metric = name, kind = kind.as_str(), "metric re-registered");
        } else {
            state.order.push(name.to_string());
        }
    }

    /// Register `name` as `kind` unless it already exists. An existing metric
    /// of the same kind only has its help text refreshed.
    pub(crate) fn describe(&self, kind: MetricType, name: &str, help: &str) {
        {
            let mut state = self.write();
            if let Some(metric) = state.metrics.get_mut(name) {
                if metric.data.kind() == kind && !help.is_empty() {
                    metric.help = help.to_string();
                }
                return;
            }
        }
        match kind {
            MetricType::Counter => self.register_counter(name, help, &[]),
            MetricType::Gauge => self.register_gauge(name, help, &[]),
            MetricType::Histogram => self.register_histogram(name, help, &[], None),
        }
    }

    /// Kind of a registered metric.
    pub fn metric_type(&self, name: &str) -> Option<MetricType> {
        self.read().metrics.get(name).map(|m| m.data.kind())
    }

    /// Declared label names of a registered metric.
    pub fn label_names(&self, name: &str) -> Option<Vec<String>> {
        self.read().metrics.get(name).map(|m| m.label_names.clone())
    }

    // ── Observation ─────────────────────────────────────────────────────────

    /// Add `delta` to a counter. Negative or non-finite deltas are swallowed.
    pub fn inc_counter(&self, name: &str, labels: &[(&str, &str)], delta: f64) {
        if !self.is_enabled() {
            return;
        }
        self.inc_counter_keyed(name, LabelKey::new(labels), delta);
    }

    pub(crate) fn inc_counter_keyed(&self, name: &str, key: LabelKey, delta: f64) {
        if !delta.is_finite() || delta < 0.0 {
            self.swallow(name, "invalid counter delta");
            return;
        }
        let mut state = self.write();
        match state.metrics.get_mut(name).map(|m| &mut m.data) {
            Some(MetricData::Counter(values)) => *values.entry(key).or_insert(0.0) += delta,
            _ => self.swallow(name, "not a registered counter"),
        }
    }

    /// Raise a counter to `value` if it is currently lower.
    pub(crate) fn absolute_counter_keyed(&self, name: &str, key: LabelKey, value: f64) {
        let mut state = self.write();
        match state.metrics.get_mut(name).map(|m| &mut m.data) {
            Some(MetricData::Counter(values)) => {
                let slot = values.entry(key).or_insert(0.0);
                *slot = slot.max(value);
            },
            _ => self.swallow(name, "not a registered counter"),
        }
    }

    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        if !self.is_enabled() {
            return;
        }
        self.update_gauge_keyed(name, LabelKey::new(labels), |slot| *slot = value);
    }

    pub fn inc_gauge(&self, name: &str, delta: f64, labels: &[(&str, &str)]) {
        if !self.is_enabled() {
            return;
        }
        self.update_gauge_keyed(name, LabelKey::new(labels), |slot| *slot += delta);
    }

    pub fn dec_gauge(&self, name: &str, delta: f64, labels: &[(&str, &str)]) {
        self.inc_gauge(name, -delta, labels);
    }

    pub(crate) fn update_gauge_keyed(&self, name: &str, key: LabelKey, apply: impl FnOnce(&mut f64)) {
        let mut state = self.write();
        match state.metrics.get_mut(name).map(|m| &mut m.data) {
            Some(MetricData::Gauge(values)) => apply(values.entry(key).or_insert(0.0)),
            _ => self.swallow(name, "not a registered gauge"),
        }
    }

    /// Record one observation. NaN is swallowed.
    pub fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        if !self.is_enabled() {
            return;
        }
        self.observe_histogram_keyed(name, LabelKey::new(labels), value);
    }

    pub(crate) fn observe_histogram_keyed(&self, name: &str, key: LabelKey, value: f64) {
        if value.is_nan() {
            self.swallow(name, "NaN observation");
            return;
        }
        // Sum, count and every bucket move together under the write lock.
        let mut state = self.write();
        match state.metrics.get_mut(name).map(|m| &mut m.data) {
            Some(MetricData::Histogram { thresholds, series }) => series
                .entry(key)
                .or_insert_with(|| HistogramSeries::new(thresholds.len()))
                .observe(thresholds, value),
            _ => self.swallow(name, "not a registered histogram"),
        }
    }

    fn swallow(&self, name: &str, reason: &'static str) {
        self.swallowed.fetch_add(1, Ordering::Relaxed);
        trace!(metric = name, reason, "metric call swallowed");
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    /// Current counter or gauge value for a label-set.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = LabelKey::new(labels);
        let state = self.read();
        match &state.metrics.get(name)?.data {
            MetricData::Counter(values) | MetricData::Gauge(values) => values.get(&key).copied(),
            MetricData::Histogram { .. } => None,
        }
    }

    /// Current histogram state for a label-set.
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramSeries> {
        let key = LabelKey::new(labels);
        let state = self.read();
        match &state.metrics.get(name)?.data {
            MetricData::Histogram { series, .. } => series.get(&key).cloned(),
            _ => None,
        }
    }

    /// Structured summary keyed by exported metric name.
    pub fn export_structured(&self) -> MetricsSummary {
        let state = self.read();
        let mut summary = MetricsSummary::new();

        for name in &state.order {
            let Some(metric) = state.metrics.get(name) else {
                continue;
            };
            let series = match &metric.data {
                MetricData::Counter(values) | MetricData::Gauge(values) => values
                    .iter()
                    .map(|(key, value)| SeriesSnapshot::Value {
                        labels: key.decode(),
                        value: *value,
                    })
                    .collect(),
                MetricData::Histogram { series, .. } => series
                    .iter()
                    .map(|(key, h)| SeriesSnapshot::Histogram {
                        labels: key.decode(),
                        sum: h.sum,
                        count: h.count,
                        mean: h.mean(),
                    })
                    .collect(),
            };
            summary.insert(metric.full_name.clone(), series);
        }

        summary
    }

    pub(crate) fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new("ai_agent", true)
    }
}
