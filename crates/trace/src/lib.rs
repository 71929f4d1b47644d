//! In-process span tracer for admitly.
//!
//! Spans are opened through a [`Tracer`], closed into an in-memory trace
//! buffer, and shipped periodically by an [`ExportWorker`] in console,
//! OTLP, Zipkin or Jaeger shape. Trace context crosses process boundaries
//! through W3C `traceparent` headers.
//!
//! ```rust,ignore
//! use admitly_trace::{SpanKind, Tracer};
//!
//! let tracer = Tracer::default();
//! let mut span = tracer.start_span("agent.request", None);
//! span.set_kind(SpanKind::Server).set_attribute("agent", "essay");
//! let child = tracer.start_span("llm.call", Some(span.context()));
//! child.end();
//! span.end();
//! ```

mod active;
mod buffer;
pub mod clock;
mod context;
mod error;
pub mod export;
pub mod propagation;
mod span;
mod tracer;
mod worker;

pub use {
    active::ActiveSpanTable,
    clock::{Clock, ManualClock, SystemClock},
    context::{FLAG_SAMPLED, SpanContext, new_span_id, new_trace_id},
    error::{Error, Result},
    export::{Resource, SpanExporter, SpanSink},
    propagation::{generate_traceparent, inject_headers, parse_traceparent},
    span::{AttributeValue, Attributes, Span, SpanBuilder, SpanEvent, SpanKind, SpanStatus},
    tracer::{DEFAULT_RETENTION, Tracer, TracerConfig},
    worker::{DEFAULT_EXPORT_INTERVAL, ExportPipeline, ExportWorker, FlushReport},
};
