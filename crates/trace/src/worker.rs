//! Periodic export of buffered spans.

use std::{sync::Arc, time::Duration};

use {
    tokio::{task::JoinHandle, time::MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    export::{SpanExporter, SpanSink},
    tracer::Tracer,
};

/// Default interval between export cycles.
pub const DEFAULT_EXPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of one export cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub exported: usize,
    pub delivered: bool,
    pub evicted: usize,
}

/// Tracer + exporter + sink: everything one export cycle needs.
#[derive(Clone)]
pub struct ExportPipeline {
    tracer: Tracer,
    exporter: Arc<dyn SpanExporter>,
    sink: Arc<dyn SpanSink>,
}

impl ExportPipeline {
    pub fn new(tracer: Tracer, exporter: Arc<dyn SpanExporter>, sink: Arc<dyn SpanSink>) -> Self {
        Self {
            tracer,
            exporter,
            sink,
        }
    }

    /// Snapshot buffered spans, encode, deliver, then evict expired spans.
    /// A failed delivery is logged and the batch dropped.
    pub async fn flush_once(&self) -> FlushReport {
        let spans = self.tracer.snapshot_for_export();
        let mut report = FlushReport {
            exported: spans.len(),
            ..FlushReport::default()
        };

        if !spans.is_empty() {
            let payload = self.exporter.encode(&spans);
            match self.sink.deliver(&payload).await {
                Ok(()) => {
                    report.delivered = true;
                    debug!(
                        exporter = self.exporter.name(),
                        spans = spans.len(),
                        "exported spans"
                    );
                },
                Err(e) => {
                    warn!(
                        exporter = self.exporter.name(),
                        spans = spans.len(),
                        error = %e,
                        "span export failed, dropping batch"
                    );
                },
            }
        }

        report.evicted = self.tracer.evict_expired();
        report
    }
}

/// Background task running [`ExportPipeline::flush_once`] on an interval.
pub struct ExportWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ExportWorker {
    /// Spawn on the current tokio runtime. Cancelling `cancel` (or calling
    /// [`ExportWorker::shutdown`]) runs one final flush before the task exits.
    pub fn spawn(pipeline: ExportPipeline, interval: Duration, cancel: CancellationToken) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(
                exporter = pipeline.exporter.name(),
                interval_secs = interval.as_secs(),
                "span export worker started"
            );
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        let report = pipeline.flush_once().await;
                        info!(exported = report.exported, "span export worker stopped after final flush");
                        break;
                    }
                    _ = ticker.tick() => {
                        pipeline.flush_once().await;
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel and wait for the final flush.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "span export worker task failed");
        }
    }
}
