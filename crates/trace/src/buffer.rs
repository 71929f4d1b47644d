//! Closed spans grouped by trace id, awaiting export.

use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use crate::span::Span;

#[derive(Debug, Default)]
pub(crate) struct TraceBuffer {
    traces: HashMap<String, Vec<Span>>,
}

impl TraceBuffer {
    pub(crate) fn record(&mut self, span: Span) {
        self.traces
            .entry(span.context.trace_id.clone())
            .or_default()
            .push(span);
    }

    pub(crate) fn get(&self, trace_id: &str) -> Vec<Span> {
        self.traces.get(trace_id).cloned().unwrap_or_default()
    }

    /// Every buffered span, flattened.
    pub(crate) fn snapshot(&self) -> Vec<Span> {
        self.traces.values().flatten().cloned().collect()
    }

    pub(crate) fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Keep spans that ended within `retention` of `now`; drop traces left
    /// empty. Returns the number of spans removed.
    pub(crate) fn evict(&mut self, now: SystemTime, retention: Duration) -> usize {
        let mut removed = 0;
        self.traces.retain(|_, spans| {
            let before = spans.len();
            spans.retain(|span| within(span, now, retention));
            removed += before - spans.len();
            !spans.is_empty()
        });
        removed
    }
}

fn within(span: &Span, now: SystemTime, retention: Duration) -> bool {
    let Some(end) = span.end_time else {
        return true;
    };
    // An end time ahead of `now` counts as fresh.
    now.duration_since(end)
        .map(|age| age <= retention)
        .unwrap_or(true)
}
