//! Jaeger Thrift-over-JSON batch (`POST /api/traces`).

use serde_json::{Value, json};

use {
    super::{Resource, SpanExporter},
    crate::{
        clock::unix_micros,
        span::{AttributeValue, Span, SpanStatus},
    },
};

#[derive(Debug, Clone)]
pub struct JaegerExporter {
    resource: Resource,
}

impl JaegerExporter {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

impl SpanExporter for JaegerExporter {
    fn name(&self) -> &'static str {
        "jaeger"
    }

    fn encode(&self, spans: &[Span]) -> Value {
        json!({
            "process": {
                "serviceName": self.resource.service_name,
                "tags": [
                    tag("service.version", &AttributeValue::from(self.resource.service_version.as_str())),
                    tag("deployment.environment", &AttributeValue::from(self.resource.environment.as_str())),
                ],
            },
            "spans": spans.iter().map(encode_span).collect::<Vec<_>>(),
        })
    }
}

fn encode_span(span: &Span) -> Value {
    let (high, low) = split_trace_id(&span.context.trace_id);
    let mut tags: Vec<Value> = span.attributes.iter().map(|(k, v)| tag(k, v)).collect();
    if span.status == SpanStatus::Error {
        tags.push(tag("error", &AttributeValue::Bool(true)));
    }

    json!({
        "traceIdHigh": high,
        "traceIdLow": low,
        "spanId": hex_i64(&span.context.span_id),
        "parentSpanId": span.context.parent_span_id.as_deref().map_or(0, hex_i64),
        "operationName": span.name,
        "flags": span.context.trace_flags,
        "startTime": unix_micros(span.start_time),
        "duration": u64::try_from(span.duration().as_micros()).unwrap_or(u64::MAX),
        "tags": tags,
        "logs": span
            .events
            .iter()
            .map(|e| json!({
                "timestamp": unix_micros(e.timestamp),
                "fields": [{ "key": "event", "vType": "STRING", "vStr": e.name }],
            }))
            .collect::<Vec<_>>(),
    })
}

fn tag(key: &str, value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Int(i) => json!({ "key": key, "vType": "LONG", "vLong": i }),
        AttributeValue::Double(d) => json!({ "key": key, "vType": "DOUBLE", "vDouble": d }),
        AttributeValue::Bool(b) => json!({ "key": key, "vType": "BOOL", "vBool": b }),
        AttributeValue::String(_) | AttributeValue::Array(_) => {
            json!({ "key": key, "vType": "STRING", "vStr": value.to_string() })
        },
    }
}

/// Thrift ids are signed 64-bit; the bit pattern of the hex id is kept.
fn hex_i64(hex: &str) -> i64 {
    u64::from_str_radix(hex, 16).map_or(0, |v| v as i64)
}

fn split_trace_id(trace_id: &str) -> (i64, i64) {
    if trace_id.len() != 32 || !trace_id.is_char_boundary(16) {
        return (0, hex_i64(trace_id));
    }
    let (high, low) = trace_id.split_at(16);
    (hex_i64(high), hex_i64(low))
}
