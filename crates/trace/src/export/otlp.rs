//! OTLP/HTTP JSON encoding (`POST /v1/traces`).

use serde_json::{Value, json};

use {
    super::{Resource, SpanExporter},
    crate::{
        clock::unix_nanos,
        span::{AttributeValue, Attributes, Span, SpanEvent, SpanKind, SpanStatus},
    },
};

const SCOPE_NAME: &str = "admitly-trace";

#[derive(Debug, Clone)]
pub struct OtlpExporter {
    resource: Resource,
}

impl OtlpExporter {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

impl SpanExporter for OtlpExporter {
    fn name(&self) -> &'static str {
        "otlp"
    }

    fn encode(&self, spans: &[Span]) -> Value {
        json!({
            "resourceSpans": [{
                "resource": {
                    "attributes": [
                        string_value("service.name", &self.resource.service_name),
                        string_value("service.version", &self.resource.service_version),
                        string_value("deployment.environment", &self.resource.environment),
                    ],
                },
                "scopeSpans": [{
                    "scope": {
                        "name": SCOPE_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                    "spans": spans.iter().map(encode_span).collect::<Vec<_>>(),
                }],
            }],
        })
    }
}

fn encode_span(span: &Span) -> Value {
    let mut out = json!({
        "traceId": span.context.trace_id,
        "spanId": span.context.span_id,
        "name": span.name,
        "kind": kind_code(span.kind),
        "startTimeUnixNano": unix_nanos(span.start_time).to_string(),
        "endTimeUnixNano": span.end_time.map(unix_nanos).unwrap_or_default().to_string(),
        "attributes": attributes(&span.attributes),
        "events": span.events.iter().map(encode_event).collect::<Vec<_>>(),
        "status": status(span),
    });
    if let (Some(parent), Some(obj)) = (&span.context.parent_span_id, out.as_object_mut()) {
        obj.insert("parentSpanId".into(), Value::String(parent.clone()));
    }
    out
}

fn encode_event(event: &SpanEvent) -> Value {
    json!({
        "timeUnixNano": unix_nanos(event.timestamp).to_string(),
        "name": event.name,
        "attributes": event.attributes.as_ref().map(attributes).unwrap_or_default(),
    })
}

fn status(span: &Span) -> Value {
    let code = match span.status {
        SpanStatus::Unset => 0,
        SpanStatus::Ok => 1,
        SpanStatus::Error => 2,
    };
    match &span.status_message {
        Some(message) => json!({ "code": code, "message": message }),
        None => json!({ "code": code }),
    }
}

fn kind_code(kind: SpanKind) -> u8 {
    match kind {
        SpanKind::Internal => 1,
        SpanKind::Server => 2,
        SpanKind::Client => 3,
        SpanKind::Producer => 4,
        SpanKind::Consumer => 5,
    }
}

fn attributes(attrs: &Attributes) -> Vec<Value> {
    attrs.iter().map(|(k, v)| key_value(k, v)).collect()
}

fn key_value(key: &str, value: &AttributeValue) -> Value {
    json!({ "key": key, "value": any_value(value) })
}

fn string_value(key: &str, value: &str) -> Value {
    json!({ "key": key, "value": { "stringValue": value } })
}

/// OTLP `AnyValue`. 64-bit integers are strings per the protobuf JSON mapping.
fn any_value(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::String(s) => json!({ "stringValue": s }),
        AttributeValue::Int(i) => json!({ "intValue": i.to_string() }),
        AttributeValue::Double(d) => json!({ "doubleValue": d }),
        AttributeValue::Bool(b) => json!({ "boolValue": b }),
        AttributeValue::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(any_value).collect::<Vec<_>>() }
        }),
    }
}
