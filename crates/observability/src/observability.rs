//! The composition root: one registry, one tracer, one export worker.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use {
    admitly_config::TelemetryConfig,
    admitly_metrics::{MetricRegistry, MetricsRecorder, MetricsSummary, register_defaults},
    admitly_trace::{
        ExportPipeline, ExportWorker, FlushReport, Resource, SpanBuilder, SpanContext, SpanSink,
        Tracer, TracerConfig,
        export::{exporter_for, sink_for},
    },
    http::HeaderMap,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{agent::AgentTelemetry, error::Result};

/// Tracing and metrics for one process.
///
/// Built once at startup and shared by `Arc`. Nothing here is global except
/// the optional `metrics` facade recorder, which must be installed
/// explicitly with [`Observability::install_metrics_recorder`].
pub struct Observability {
    config: TelemetryConfig,
    registry: Arc<MetricRegistry>,
    tracer: Tracer,
    pipeline: ExportPipeline,
    cancel: CancellationToken,
    worker: Mutex<Option<ExportWorker>>,
}

impl Observability {
    /// Build from config, delivering spans to the sink the config selects.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP export client cannot be constructed.
    pub fn new(config: TelemetryConfig) -> Result<Self> {
        let sink = sink_for(&config)?;
        Ok(Self::with_sink(config, sink))
    }

    /// Build with an explicit delivery sink.
    pub fn with_sink(config: TelemetryConfig, sink: Arc<dyn SpanSink>) -> Self {
        let registry = Arc::new(MetricRegistry::new(
            config.metrics.prefix.clone(),
            config.metrics.enabled,
        ));
        register_defaults(&registry);

        let tracer = Tracer::new(TracerConfig::from(&config));
        let exporter = exporter_for(config.exporter, Resource::from(&config));
        let pipeline = ExportPipeline::new(tracer.clone(), exporter, sink);

        Self {
            config,
            registry,
            tracer,
            pipeline,
            cancel: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Domain helpers sharing this instance's registry and tracer.
    pub fn agent(&self) -> AgentTelemetry {
        AgentTelemetry::new(Arc::clone(&self.registry), self.tracer.clone())
    }

    /// Start the periodic export worker on the current tokio runtime. A
    /// second call, or a call with tracing disabled, does nothing.
    pub fn start_export_worker(&self) {
        if !self.config.enabled {
            info!("tracing disabled, span export worker not started");
            return;
        }
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return;
        }
        let interval = Duration::from_secs(self.config.export_interval_secs.max(1));
        *worker = Some(ExportWorker::spawn(
            self.pipeline.clone(),
            interval,
            self.cancel.child_token(),
        ));
    }

    /// Route `metrics::counter!` and friends into this registry.
    ///
    /// # Errors
    ///
    /// Fails if another global recorder is already installed.
    pub fn install_metrics_recorder(&self) -> Result<()> {
        MetricsRecorder::new(Arc::clone(&self.registry)).install()?;
        Ok(())
    }

    /// Run one export cycle now.
    pub async fn flush(&self) -> FlushReport {
        self.pipeline.flush_once().await
    }

    /// Stop the export worker after its final flush. Without a running
    /// worker, buffered spans are flushed directly.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match worker {
            Some(worker) => worker.shutdown().await,
            None => {
                self.pipeline.flush_once().await;
            },
        }
        info!("observability shut down");
    }

    // Tracing

    pub fn start_span(&self, name: impl Into<String>, parent: Option<&SpanContext>) -> SpanBuilder {
        self.tracer.start_span(name, parent)
    }

    pub fn start_span_from_headers(
        &self,
        name: impl Into<String>,
        headers: &HeaderMap,
    ) -> SpanBuilder {
        self.tracer.start_span_from_headers(name, headers)
    }

    pub fn trace<T, E, F>(
        &self,
        name: impl Into<String>,
        parent: Option<&SpanContext>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut SpanBuilder) -> std::result::Result<T, E>,
        E: fmt::Display + fmt::Debug,
    {
        self.tracer.trace(name, parent, f)
    }

    pub async fn trace_async<T, E, F, Fut>(
        &self,
        name: impl Into<String>,
        parent: Option<&SpanContext>,
        f: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(SpanContext) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        self.tracer.trace_async(name, parent, f).await
    }

    pub fn set_active_span(&self, request_id: impl Into<String>, ctx: SpanContext) {
        self.tracer.set_active_span(request_id, ctx);
    }

    pub fn get_active_span(&self, request_id: &str) -> Option<SpanContext> {
        self.tracer.get_active_span(request_id)
    }

    pub fn clear_active_span(&self, request_id: &str) -> Option<SpanContext> {
        self.tracer.clear_active_span(request_id)
    }

    // Metrics

    pub fn inc_counter(&self, name: &str, labels: &[(&str, &str)], delta: f64) {
        self.registry.inc_counter(name, labels, delta);
    }

    pub fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.registry.set_gauge(name, value, labels);
    }

    pub fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.registry.observe_histogram(name, value, labels);
    }

    pub fn export_text(&self) -> String {
        self.registry.export_text()
    }

    pub fn export_structured(&self) -> MetricsSummary {
        self.registry.export_structured()
    }
}

impl fmt::Debug for Observability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observability")
            .field("service", &self.config.service_name)
            .field("exporter", &self.config.exporter)
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}
