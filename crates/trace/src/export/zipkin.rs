//! Zipkin v2 JSON (`POST /api/v2/spans`).

use serde_json::{Map, Value, json};

use {
    super::{Resource, SpanExporter},
    crate::{
        clock::unix_micros,
        span::{Span, SpanKind, SpanStatus},
    },
};

#[derive(Debug, Clone)]
pub struct ZipkinExporter {
    resource: Resource,
}

impl ZipkinExporter {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }

    fn encode_span(&self, span: &Span) -> Value {
        let mut tags: Map<String, Value> = span
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        if span.status == SpanStatus::Error {
            tags.insert(
                "error".into(),
                Value::String(span.status_message.clone().unwrap_or_default()),
            );
        }

        let mut out = json!({
            "traceId": span.context.trace_id,
            "id": span.context.span_id,
            "name": span.name,
            "timestamp": unix_micros(span.start_time),
            "duration": u64::try_from(span.duration().as_micros()).unwrap_or(u64::MAX),
            "localEndpoint": { "serviceName": self.resource.service_name },
            "tags": tags,
            "annotations": span
                .events
                .iter()
                .map(|e| json!({ "timestamp": unix_micros(e.timestamp), "value": e.name }))
                .collect::<Vec<_>>(),
        });

        if let Some(obj) = out.as_object_mut() {
            if let Some(parent) = &span.context.parent_span_id {
                obj.insert("parentId".into(), Value::String(parent.clone()));
            }
            if let Some(kind) = zipkin_kind(span.kind) {
                obj.insert("kind".into(), Value::String(kind.into()));
            }
        }
        out
    }
}

/// Zipkin has no INTERNAL kind; the field is omitted instead.
fn zipkin_kind(kind: SpanKind) -> Option<&'static str> {
    match kind {
        SpanKind::Internal => None,
        SpanKind::Server => Some("SERVER"),
        SpanKind::Client => Some("CLIENT"),
        SpanKind::Producer => Some("PRODUCER"),
        SpanKind::Consumer => Some("CONSUMER"),
    }
}

impl SpanExporter for ZipkinExporter {
    fn name(&self) -> &'static str {
        "zipkin"
    }

    fn encode(&self, spans: &[Span]) -> Value {
        Value::Array(spans.iter().map(|s| self.encode_span(s)).collect())
    }
}
