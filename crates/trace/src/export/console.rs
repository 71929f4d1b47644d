use serde_json::{Value, json};

use {super::SpanExporter, crate::span::Span};

/// Flat one-object-per-span summary for local debugging.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleExporter;

impl ConsoleExporter {
    /// Summary of a single span. Also used by the trace lookup route.
    pub fn span_summary(span: &Span) -> Value {
        json!({
            "traceId": span.context.trace_id,
            "spanId": span.context.span_id,
            "parentSpanId": span.context.parent_span_id,
            "name": span.name,
            "kind": span.kind.as_str(),
            "status": span.status.as_str(),
            "durationMs": span.duration().as_secs_f64() * 1000.0,
            "attributes": span.attributes.to_json(),
            "eventCount": span.events.len(),
        })
    }
}

impl SpanExporter for ConsoleExporter {
    fn name(&self) -> &'static str {
        "console"
    }

    fn encode(&self, spans: &[Span]) -> Value {
        Value::Array(spans.iter().map(Self::span_summary).collect())
    }
}
