#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    admitly_trace::{
        ManualClock, Resource, Span, SpanExporter, SpanKind, Tracer, TracerConfig,
        export::{ConsoleExporter, JaegerExporter, OtlpExporter, ZipkinExporter},
    },
    serde_json::Value,
};

fn resource() -> Resource {
    Resource {
        service_name: "advisor".into(),
        service_version: "2.1.0".into(),
        environment: "staging".into(),
    }
}

/// Root SERVER span with two attributes and one event, 1.5s long.
fn sample_span() -> Span {
    let clock = Arc::new(ManualClock::default());
    let tracer = Tracer::with_clock(TracerConfig::default(), clock.clone());
    let mut builder = tracer.start_span("agent.request", None);
    builder
        .set_kind(SpanKind::Server)
        .set_attribute("agent", "essay")
        .set_attribute("tokens", 42_i64);
    clock.advance(Duration::from_millis(500));
    builder.add_event("retrieved");
    clock.advance(Duration::from_millis(1000));
    builder.end().unwrap()
}

#[test]
fn console_shape() {
    let span = sample_span();
    let out = ConsoleExporter.encode(std::slice::from_ref(&span));
    let entry = &out[0];

    assert_eq!(entry["traceId"], span.context.trace_id.as_str());
    assert_eq!(entry["spanId"], span.context.span_id.as_str());
    assert!(entry["parentSpanId"].is_null());
    assert_eq!(entry["name"], "agent.request");
    assert_eq!(entry["kind"], "SERVER");
    assert_eq!(entry["status"], "UNSET");
    assert_eq!(entry["durationMs"], 1500.0);
    assert_eq!(entry["attributes"].as_object().unwrap().len(), 2);
    assert_eq!(entry["attributes"]["tokens"], 42);
    assert_eq!(entry["eventCount"], 1);
}

#[test]
fn otlp_shape() {
    let span = sample_span();
    let out = OtlpExporter::new(resource()).encode(std::slice::from_ref(&span));

    let resource_attrs = out["resourceSpans"][0]["resource"]["attributes"]
        .as_array()
        .unwrap();
    let service = resource_attrs
        .iter()
        .find(|kv| kv["key"] == "service.name")
        .unwrap();
    assert_eq!(service["value"]["stringValue"], "advisor");
    assert!(
        resource_attrs
            .iter()
            .any(|kv| kv["key"] == "deployment.environment" && kv["value"]["stringValue"] == "staging")
    );

    let encoded = &out["resourceSpans"][0]["scopeSpans"][0]["spans"][0];
    assert_eq!(encoded["traceId"], span.context.trace_id.as_str());
    assert!(encoded.get("parentSpanId").is_none());
    assert_eq!(encoded["kind"], 2);
    assert_eq!(encoded["startTimeUnixNano"], "1700000000000000000");
    assert_eq!(encoded["endTimeUnixNano"], "1700000001500000000");
    assert_eq!(encoded["status"]["code"], 0);

    let attrs = encoded["attributes"].as_array().unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs[0]["key"], "agent");
    assert_eq!(attrs[0]["value"]["stringValue"], "essay");
    assert_eq!(attrs[1]["key"], "tokens");
    assert_eq!(attrs[1]["value"]["intValue"], "42");

    let events = encoded["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["name"], "retrieved");
    assert_eq!(events[0]["timeUnixNano"], "1700000000500000000");
}

#[test]
fn zipkin_shape() {
    let span = sample_span();
    let out = ZipkinExporter::new(resource()).encode(std::slice::from_ref(&span));
    let entry = &out[0];

    assert_eq!(entry["id"], span.context.span_id.as_str());
    assert!(entry.get("parentId").is_none());
    assert_eq!(entry["kind"], "SERVER");
    assert_eq!(entry["timestamp"], 1_700_000_000_000_000_u64);
    assert_eq!(entry["duration"], 1_500_000);
    assert_eq!(entry["localEndpoint"]["serviceName"], "advisor");

    let tags = entry["tags"].as_object().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags["tokens"], "42");
    assert_eq!(tags["agent"], "essay");

    let annotations = entry["annotations"].as_array().unwrap();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0]["value"], "retrieved");
}

#[test]
fn zipkin_omits_internal_kind() {
    let tracer = Tracer::default();
    let root = tracer.start_span("root", None);
    let child = tracer.start_span("child", Some(root.context())).end().unwrap();
    let out = ZipkinExporter::new(resource()).encode(&[child.clone()]);

    assert!(out[0].get("kind").is_none());
    assert_eq!(out[0]["parentId"], root.context().span_id.as_str());
}

#[test]
fn jaeger_shape() {
    let span = sample_span();
    let out = JaegerExporter::new(resource()).encode(std::slice::from_ref(&span));

    assert_eq!(out["process"]["serviceName"], "advisor");
    let encoded = &out["spans"][0];
    assert_eq!(encoded["operationName"], "agent.request");
    assert_eq!(encoded["parentSpanId"], 0);
    assert_eq!(encoded["startTime"], 1_700_000_000_000_000_u64);
    assert_eq!(encoded["duration"], 1_500_000);

    let high = encoded["traceIdHigh"].as_i64().unwrap() as u64;
    let low = encoded["traceIdLow"].as_i64().unwrap() as u64;
    assert_eq!(format!("{high:016x}{low:016x}"), span.context.trace_id);
    let span_id = encoded["spanId"].as_i64().unwrap() as u64;
    assert_eq!(format!("{span_id:016x}"), span.context.span_id);

    let tags = encoded["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    let tokens = tags.iter().find(|t| t["key"] == "tokens").unwrap();
    assert_eq!(tokens["vType"], "LONG");
    assert_eq!(tokens["vLong"], 42);

    let logs = encoded["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["fields"][0]["vStr"], "retrieved");
}

#[test]
fn error_status_reaches_every_format() {
    let tracer = Tracer::default();
    let _: Result<(), String> = tracer.trace("payment.charge", None, |_| Err("card declined".into()));
    let spans = tracer.snapshot_for_export();

    let otlp = OtlpExporter::new(resource()).encode(&spans);
    let status = &otlp["resourceSpans"][0]["scopeSpans"][0]["spans"][0]["status"];
    assert_eq!(status["code"], 2);
    assert_eq!(status["message"], "card declined");

    let zipkin = ZipkinExporter::new(resource()).encode(&spans);
    assert_eq!(zipkin[0]["tags"]["error"], "card declined");

    let jaeger = JaegerExporter::new(resource()).encode(&spans);
    let tags = jaeger["spans"][0]["tags"].as_array().unwrap();
    assert!(tags.iter().any(|t| t["key"] == "error" && t["vBool"] == Value::Bool(true)));

    let console = ConsoleExporter.encode(&spans);
    assert_eq!(console[0]["status"], "ERROR");
    assert_eq!(console[0]["eventCount"], 1);
}
