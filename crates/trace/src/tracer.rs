//! The span tracer: sampling, span creation, buffering and lookup.

use std::{
    any::Any,
    fmt,
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use {admitly_config::TelemetryConfig, http::HeaderMap, tracing::debug};

use crate::{
    active::ActiveSpanTable,
    buffer::TraceBuffer,
    clock::{Clock, SystemClock},
    context::SpanContext,
    propagation,
    span::{Span, SpanBuilder, SpanStatus},
};

/// Default retention window for buffered spans.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct TracerConfig {
    /// When false every span is non-recording.
    pub enabled: bool,
    /// Probability in `[0, 1]` that a new span is recorded.
    pub sampling_ratio: f64,
    pub retention: Duration,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sampling_ratio: 1.0,
            retention: DEFAULT_RETENTION,
        }
    }
}

impl From<&TelemetryConfig> for TracerConfig {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            sampling_ratio: config.effective_sampling_ratio(),
            retention: Duration::from_secs(config.retention_secs),
        }
    }
}

pub(crate) struct TracerShared {
    pub(crate) clock: Arc<dyn Clock>,
    enabled: bool,
    sampling_ratio: f64,
    retention: Duration,
    buffer: Mutex<TraceBuffer>,
    active: ActiveSpanTable,
}

impl TracerShared {
    pub(crate) fn record(&self, span: Span) {
        self.buffer().record(span);
    }

    fn buffer(&self) -> MutexGuard<'_, TraceBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sampling is decided once per span, at creation.
    fn should_sample(&self) -> bool {
        if !self.enabled {
            return false;
        }
        if self.sampling_ratio >= 1.0 {
            return true;
        }
        if self.sampling_ratio <= 0.0 {
            return false;
        }
        rand::random::<f64>() < self.sampling_ratio
    }
}

/// Cheap to clone; clones share one buffer and active-span table.
#[derive(Clone)]
pub struct Tracer {
    shared: Arc<TracerShared>,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TracerConfig, clock: Arc<dyn Clock>) -> Self {
        let sampling_ratio = if config.sampling_ratio.is_nan() {
            1.0
        } else {
            config.sampling_ratio.clamp(0.0, 1.0)
        };
        Self {
            shared: Arc::new(TracerShared {
                clock,
                enabled: config.enabled,
                sampling_ratio,
                retention: config.retention,
                buffer: Mutex::new(TraceBuffer::default()),
                active: ActiveSpanTable::default(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled
    }

    pub fn sampling_ratio(&self) -> f64 {
        self.shared.sampling_ratio
    }

    /// Open a span. With a parent it joins the parent's trace; otherwise it
    /// starts a new one.
    pub fn start_span(&self, name: impl Into<String>, parent: Option<&SpanContext>) -> SpanBuilder {
        let sampled = self.shared.should_sample();
        let context = SpanContext::child_of(parent, sampled);
        if !sampled {
            return SpanBuilder::non_recording(context);
        }
        let span = Span::open(context, name.into(), self.shared.clock.now());
        SpanBuilder::recording(span, Arc::clone(&self.shared))
    }

    /// Open a span whose parent comes from inbound `traceparent` /
    /// `tracestate` headers. Missing or malformed headers start a new trace.
    pub fn start_span_from_headers(
        &self,
        name: impl Into<String>,
        headers: &HeaderMap,
    ) -> SpanBuilder {
        let parent = propagation::extract(headers);
        self.start_span(name, parent.as_ref())
    }

    /// Run `f` inside a span. `Ok` sets status OK; `Err` is recorded as an
    /// exception and returned unchanged. A panic in `f` marks the span ERROR
    /// with the panic message, ends it, and keeps unwinding.
    pub fn trace<T, E, F>(
        &self,
        name: impl Into<String>,
        parent: Option<&SpanContext>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut SpanBuilder) -> Result<T, E>,
        E: fmt::Display + fmt::Debug,
    {
        let mut span = self.start_span(name, parent);
        let result = match panic::catch_unwind(AssertUnwindSafe(|| f(&mut span))) {
            Ok(result) => result,
            Err(payload) => {
                span.record_exception(panic_message(payload.as_ref()));
                span.end();
                panic::resume_unwind(payload);
            },
        };
        match &result {
            Ok(_) => {
                span.set_status(SpanStatus::Ok, None);
            },
            Err(e) => {
                span.record_exception(e);
            },
        }
        span.end();
        result
    }

    /// Async form of [`Tracer::trace`]. `f` receives the span's context so
    /// it can open children or propagate it outbound. If the returned
    /// future is dropped before completion, or panics while polled, the span
    /// still ends but its status stays UNSET.
    pub async fn trace_async<T, E, F, Fut>(
        &self,
        name: impl Into<String>,
        parent: Option<&SpanContext>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(SpanContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let mut span = self.start_span(name, parent);
        let result = f(span.context().clone()).await;
        match &result {
            Ok(_) => {
                span.set_status(SpanStatus::Ok, None);
            },
            Err(e) => {
                span.record_exception(e);
            },
        }
        span.end();
        result
    }

    /// Buffer an externally built, already closed span.
    pub fn record_span(&self, span: Span) {
        self.shared.record(span);
    }

    /// Buffered spans of one trace; empty when unknown or evicted.
    pub fn get_trace(&self, trace_id: &str) -> Vec<Span> {
        self.shared.buffer().get(trace_id)
    }

    /// Snapshot of everything buffered. Spans stay buffered until evicted.
    pub fn snapshot_for_export(&self) -> Vec<Span> {
        self.shared.buffer().snapshot()
    }

    pub fn buffered_trace_count(&self) -> usize {
        self.shared.buffer().trace_count()
    }

    /// Drop spans that ended outside the retention window.
    pub fn evict_expired(&self) -> usize {
        let now = self.shared.clock.now();
        let removed = self.shared.buffer().evict(now, self.shared.retention);
        if removed > 0 {
            debug!(removed, "evicted expired spans");
        }
        removed
    }

    pub fn set_active_span(&self, request_id: impl Into<String>, ctx: SpanContext) {
        self.shared.active.set(request_id, ctx);
    }

    pub fn get_active_span(&self, request_id: &str) -> Option<SpanContext> {
        self.shared.active.get(request_id)
    }

    pub fn clear_active_span(&self, request_id: &str) -> Option<SpanContext> {
        self.shared.active.clear(request_id)
    }

    pub fn active_spans(&self) -> &ActiveSpanTable {
        &self.shared.active
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "panic"
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.shared.enabled)
            .field("sampling_ratio", &self.shared.sampling_ratio)
            .field("retention", &self.shared.retention)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            clock::ManualClock,
            span::{AttributeValue, SpanKind},
        },
    };

    fn sampled(ratio: f64) -> Tracer {
        Tracer::new(TracerConfig {
            sampling_ratio: ratio,
            ..TracerConfig::default()
        })
    }

    #[test]
    fn span_tree_shares_trace_id() {
        let tracer = Tracer::default();
        let root = tracer.start_span("agent.request", None);
        let child = tracer.start_span("llm.call", Some(root.context()));
        let grandchild = tracer.start_span("http.post", Some(child.context()));

        let root_ctx = root.context().clone();
        let child_ctx = child.context().clone();
        let grand = grandchild.end().unwrap();
        child.end();
        root.end();

        assert_eq!(grand.context.trace_id, root_ctx.trace_id);
        assert_eq!(grand.context.parent_span_id.as_deref(), Some(child_ctx.span_id.as_str()));
        assert_eq!(child_ctx.parent_span_id.as_deref(), Some(root_ctx.span_id.as_str()));
        assert!(root_ctx.parent_span_id.is_none());
        assert_eq!(tracer.get_trace(&root_ctx.trace_id).len(), 3);
    }

    #[test]
    fn end_sets_end_time_and_buffers() {
        let clock = Arc::new(ManualClock::default());
        let tracer = Tracer::with_clock(TracerConfig::default(), clock.clone());

        let mut builder = tracer.start_span("op", None);
        builder
            .set_kind(SpanKind::Client)
            .set_attribute("http.status_code", 200_i64);
        clock.advance(Duration::from_millis(250));
        let span = builder.end().unwrap();

        assert_eq!(span.kind, SpanKind::Client);
        assert_eq!(span.duration(), Duration::from_millis(250));
        assert_eq!(
            span.attributes.get("http.status_code"),
            Some(&AttributeValue::Int(200))
        );
        assert_eq!(tracer.snapshot_for_export(), vec![span]);
    }

    #[test]
    fn sampling_zero_buffers_nothing() {
        let tracer = sampled(0.0);
        for _ in 0..20 {
            let mut span = tracer.start_span("op", None);
            assert!(!span.is_recording());
            span.set_attribute("ignored", true).add_event("ignored");
            assert!(span.end().is_none());
        }
        assert!(tracer.snapshot_for_export().is_empty());
    }

    #[test]
    fn sampling_one_buffers_every_span() {
        let tracer = sampled(1.0);
        for _ in 0..20 {
            assert!(tracer.start_span("op", None).end().is_some());
        }
        assert_eq!(tracer.snapshot_for_export().len(), 20);
    }

    #[test]
    fn disabled_tracer_still_propagates_context() {
        let tracer = Tracer::new(TracerConfig {
            enabled: false,
            ..TracerConfig::default()
        });
        let root = tracer.start_span("op", None);
        let child = tracer.start_span("child", Some(root.context()));
        assert_eq!(child.context().trace_id, root.context().trace_id);
        assert_eq!(root.context().trace_flags, 0);
    }

    #[test]
    fn dropped_builder_ends_once() {
        let tracer = Tracer::default();
        {
            let _span = tracer.start_span("forgotten", None);
        }
        let spans = tracer.snapshot_for_export();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].end_time.is_some());
    }

    #[test]
    fn trace_marks_ok() {
        let tracer = Tracer::default();
        let out: Result<u32, String> = tracer.trace("work", None, |span| {
            span.set_attribute("items", 3_i64);
            Ok(3)
        });
        assert_eq!(out, Ok(3));
        let spans = tracer.snapshot_for_export();
        assert_eq!(spans[0].status, SpanStatus::Ok);
    }

    #[test]
    fn trace_records_error_and_returns_it_unchanged() {
        let tracer = Tracer::default();
        let out: Result<(), String> = tracer.trace("work", None, |_| Err("quota exceeded".into()));
        assert_eq!(out, Err("quota exceeded".to_string()));

        let span = &tracer.snapshot_for_export()[0];
        assert_eq!(span.status, SpanStatus::Error);
        assert_eq!(span.status_message.as_deref(), Some("quota exceeded"));
        let event = &span.events[0];
        assert_eq!(event.name, "exception");
        let attrs = event.attributes.as_ref().unwrap();
        assert_eq!(
            attrs.get("exception.message"),
            Some(&AttributeValue::from("quota exceeded"))
        );
    }

    #[test]
    fn trace_ends_span_when_closure_panics() {
        let tracer = Tracer::default();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), String> = tracer.trace("boom", None, |_| panic!("boom"));
        }));
        assert!(caught.is_err());

        let spans = tracer.snapshot_for_export();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(spans[0].status_message.as_deref(), Some("boom"));
        let panic_event = &spans[0].events[0];
        assert_eq!(panic_event.name, "exception");
        let attrs = panic_event.attributes.as_ref().unwrap();
        assert_eq!(
            attrs.get("exception.message"),
            Some(&AttributeValue::from("boom"))
        );
    }

    #[test]
    fn trace_keeps_formatted_panic_message() {
        let tracer = Tracer::default();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), String> =
                tracer.trace("essay.grade", None, |_| panic!("rubric {} missing", 7));
        }));
        assert!(caught.is_err());

        let spans = tracer.snapshot_for_export();
        assert_eq!(spans[0].status_message.as_deref(), Some("rubric 7 missing"));
    }

    #[tokio::test]
    async fn trace_async_passes_context_to_children() {
        let tracer = Tracer::default();
        let inner = tracer.clone();
        let out: Result<String, String> = tracer
            .trace_async("agent.request", None, |ctx| async move {
                inner.start_span("tool.call", Some(&ctx)).end();
                Ok(ctx.trace_id)
            })
            .await;

        let trace_id = out.unwrap();
        let spans = tracer.get_trace(&trace_id);
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.status != SpanStatus::Error));
    }

    #[test]
    fn retention_evicts_old_spans() {
        let clock = Arc::new(ManualClock::default());
        let tracer = Tracer::with_clock(
            TracerConfig {
                retention: Duration::from_secs(300),
                ..TracerConfig::default()
            },
            clock.clone(),
        );

        let old = tracer.start_span("old", None).end().unwrap();
        clock.advance(Duration::from_secs(360));
        let fresh = tracer.start_span("fresh", None).end().unwrap();

        assert_eq!(tracer.evict_expired(), 1);
        assert!(tracer.get_trace(&old.context.trace_id).is_empty());
        assert_eq!(tracer.get_trace(&fresh.context.trace_id).len(), 1);
    }

    #[test]
    fn headers_parent_or_new_root() {
        let tracer = Tracer::default();
        let mut headers = HeaderMap::new();
        headers.insert(
            propagation::TRACEPARENT_HEADER,
            http::HeaderValue::from_static(
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
            ),
        );
        let span = tracer.start_span_from_headers("inbound", &headers);
        assert_eq!(span.context().trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(span.context().parent_span_id.as_deref(), Some("00f067aa0ba902b7"));

        headers.insert(
            propagation::TRACEPARENT_HEADER,
            http::HeaderValue::from_static("not-a-traceparent"),
        );
        let root = tracer.start_span_from_headers("inbound", &headers);
        assert!(root.context().is_root());
    }

    #[test]
    fn active_span_round_trip() {
        let tracer = Tracer::default();
        let span = tracer.start_span("request", None);
        tracer.set_active_span("req-42", span.context().clone());
        assert_eq!(tracer.get_active_span("req-42").as_ref(), Some(span.context()));
        tracer.clear_active_span("req-42");
        assert!(tracer.get_active_span("req-42").is_none());
    }
}
