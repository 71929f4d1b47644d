//! W3C trace-context propagation (`traceparent` / `tracestate`).
//!
//! ```text
//! traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//!              ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^ ^^
//!         version trace-id                         parent span-id   flags
//! ```
//!
//! Parsing never fails loudly: anything malformed yields `None` and the
//! caller starts a new root trace.

use http::{HeaderMap, HeaderValue};

use crate::context::{SpanContext, is_lower_hex};

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

const VERSION: &str = "00";

/// Render `ctx` as a `traceparent` value.
pub fn generate_traceparent(ctx: &SpanContext) -> String {
    format!(
        "{VERSION}-{}-{}-{:02x}",
        ctx.trace_id, ctx.span_id, ctx.trace_flags
    )
}

/// Parse a `traceparent` value into the remote parent's context.
///
/// Returns `None` unless the value has exactly four `-`separated fields with
/// hex version, 32-hex trace id, 16-hex span id and hex flags.
pub fn parse_traceparent(value: &str) -> Option<SpanContext> {
    let value = value.trim().to_ascii_lowercase();
    let mut parts = value.split('-');
    let (Some(version), Some(trace_id), Some(span_id), Some(flags), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return None;
    };

    if !is_lower_hex(version, 2) || !is_lower_hex(trace_id, 32) || !is_lower_hex(span_id, 16) {
        return None;
    }
    if flags.len() != 2 {
        return None;
    }
    let trace_flags = u8::from_str_radix(flags, 16).ok()?;

    Some(SpanContext {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: None,
        trace_flags,
        trace_state: None,
    })
}

/// Remote parent carried by inbound request headers, if any.
pub fn extract(headers: &HeaderMap) -> Option<SpanContext> {
    let traceparent = headers.get(TRACEPARENT_HEADER)?.to_str().ok()?;
    let mut ctx = parse_traceparent(traceparent)?;
    ctx.trace_state = headers
        .get(TRACESTATE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Some(ctx)
}

/// Write `traceparent` (and `tracestate` when present) for an outbound call.
pub fn inject_headers(ctx: &SpanContext, headers: &mut HeaderMap) {
    if let Ok(value) = HeaderValue::from_str(&generate_traceparent(ctx)) {
        headers.insert(TRACEPARENT_HEADER, value);
    }
    if let Some(value) = ctx
        .trace_state
        .as_deref()
        .and_then(|s| HeaderValue::from_str(s).ok())
    {
        headers.insert(TRACESTATE_HEADER, value);
    }
}
