use dashmap::DashMap;

use crate::context::SpanContext;

/// Request id → context of the span currently serving that request.
///
/// Entries live until cleared; callers are expected to clear when the
/// request finishes.
#[derive(Debug, Default)]
pub struct ActiveSpanTable {
    spans: DashMap<String, SpanContext>,
}

impl ActiveSpanTable {
    pub fn set(&self, request_id: impl Into<String>, ctx: SpanContext) {
        self.spans.insert(request_id.into(), ctx);
    }

    pub fn get(&self, request_id: &str) -> Option<SpanContext> {
        self.spans.get(request_id).map(|entry| entry.value().clone())
    }

    pub fn clear(&self, request_id: &str) -> Option<SpanContext> {
        self.spans.remove(request_id).map(|(_, ctx)| ctx)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
