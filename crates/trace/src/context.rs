use serde::{Deserialize, Serialize};

/// Trace flag bit meaning "this span is recorded".
pub const FLAG_SAMPLED: u8 = 0x01;

/// Identity of a span within a trace. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters.
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub trace_flags: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
}

impl SpanContext {
    /// Context for a fresh span, child of `parent` when given.
    pub(crate) fn child_of(parent: Option<&SpanContext>, sampled: bool) -> Self {
        let trace_flags = if sampled { FLAG_SAMPLED } else { 0 };
        match parent {
            Some(parent) => Self {
                trace_id: parent.trace_id.clone(),
                span_id: new_span_id(),
                parent_span_id: Some(parent.span_id.clone()),
                trace_flags,
                trace_state: parent.trace_state.clone(),
            },
            None => Self {
                trace_id: new_trace_id(),
                span_id: new_span_id(),
                parent_span_id: None,
                trace_flags,
                trace_state: None,
            },
        }
    }

    pub fn is_sampled(&self) -> bool {
        self.trace_flags & FLAG_SAMPLED != 0
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }
}

/// Random 128-bit trace id. The all-zero id is invalid in W3C and never returned.
pub fn new_trace_id() -> String {
    loop {
        let id: u128 = rand::random();
        if id != 0 {
            return format!("{id:032x}");
        }
    }
}

/// Random 64-bit span id, never all zeros.
pub fn new_span_id() -> String {
    loop {
        let id: u64 = rand::random();
        if id != 0 {
            return format!("{id:016x}");
        }
    }
}

pub(crate) fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
