//! Span data model and the builder used while a span is open.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use crate::{context::SpanContext, tracer::TracerShared};

/// Role of a span in a request flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpanKind {
    #[default]
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Producer => "PRODUCER",
            Self::Consumer => "CONSUMER",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute value: string, integer, double, boolean or a homogeneous-ish array.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Plain JSON rendering (no type tags).
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Int(i) => Value::from(*i),
            Self::Double(d) => serde_json::Number::from_f64(*d).map_or(Value::Null, Value::Number),
            Self::Bool(b) => Value::Bool(*b),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&String> for AttributeValue {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        Self::Double(v.into())
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered attribute map. Setting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain JSON object of the attributes.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// Timestamped annotation inside a span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: SystemTime,
    pub attributes: Option<Attributes>,
}

/// A unit of timed work.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub context: SpanContext,
    pub name: String,
    pub kind: SpanKind,
    pub start_time: SystemTime,
    /// `None` while open.
    pub end_time: Option<SystemTime>,
    pub attributes: Attributes,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
    pub status_message: Option<String>,
}

impl Span {
    pub(crate) fn open(context: SpanContext, name: String, start_time: SystemTime) -> Self {
        Self {
            context,
            name,
            kind: SpanKind::Internal,
            start_time,
            end_time: None,
            attributes: Attributes::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
            status_message: None,
        }
    }

    /// Elapsed time between start and end; zero while open.
    pub fn duration(&self) -> Duration {
        self.end_time
            .and_then(|end| end.duration_since(self.start_time).ok())
            .unwrap_or_default()
    }
}

struct Recording {
    span: Span,
    tracer: Arc<TracerShared>,
}

/// An open span.
///
/// Sampled-out spans are non-recording: they still carry a context so
/// children and outbound headers stay in the same trace, but every mutator
/// is a no-op and nothing reaches the buffer.
///
/// [`SpanBuilder::end`] closes the span. A builder dropped without `end`
/// (early return, `?`, panic, cancelled future) is closed on drop, so a
/// span is recorded exactly once.
pub struct SpanBuilder {
    context: SpanContext,
    recording: Option<Recording>,
}

impl SpanBuilder {
    pub(crate) fn recording(span: Span, tracer: Arc<TracerShared>) -> Self {
        Self {
            context: span.context.clone(),
            recording: Some(Recording { span, tracer }),
        }
    }

    pub(crate) fn non_recording(context: SpanContext) -> Self {
        Self {
            context,
            recording: None,
        }
    }

    pub fn context(&self) -> &SpanContext {
        &self.context
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn set_kind(&mut self, kind: SpanKind) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.span.kind = kind;
        }
        self
    }

    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.span.attributes.insert(key, value);
        }
        self
    }

    pub fn set_attributes<I, K, V>(&mut self, attributes: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        if let Some(rec) = &mut self.recording {
            for (k, v) in attributes {
                rec.span.attributes.insert(k, v);
            }
        }
        self
    }

    pub fn add_event(&mut self, name: impl Into<String>) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            let timestamp = rec.tracer.clock.now();
            rec.span.events.push(SpanEvent {
                name: name.into(),
                timestamp,
                attributes: None,
            });
        }
        self
    }

    pub fn add_event_with_attributes<I, K, V>(
        &mut self,
        name: impl Into<String>,
        attributes: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        if let Some(rec) = &mut self.recording {
            let timestamp = rec.tracer.clock.now();
            rec.span.events.push(SpanEvent {
                name: name.into(),
                timestamp,
                attributes: Some(attributes.into_iter().collect()),
            });
        }
        self
    }

    pub fn set_status(&mut self, status: SpanStatus, message: Option<&str>) -> &mut Self {
        if let Some(rec) = &mut self.recording {
            rec.span.status = status;
            rec.span.status_message = message.map(str::to_string);
        }
        self
    }

    /// Add an `exception` event (type, message, debug rendering) and mark
    /// the span as failed.
    pub fn record_exception<E>(&mut self, error: &E) -> &mut Self
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        if !self.is_recording() {
            return self;
        }
        let message = error.to_string();
        self.add_event_with_attributes("exception", [
            ("exception.type", AttributeValue::from(std::any::type_name::<E>())),
            ("exception.message", AttributeValue::from(message.as_str())),
            ("exception.stacktrace", AttributeValue::from(format!("{error:?}"))),
        ]);
        self.set_status(SpanStatus::Error, Some(&message))
    }

    /// Close the span and hand it to the trace buffer. Returns the closed
    /// span, or `None` for a non-recording span.
    pub fn end(mut self) -> Option<Span> {
        self.finish()
    }

    fn finish(&mut self) -> Option<Span> {
        let Recording { mut span, tracer } = self.recording.take()?;
        span.end_time = Some(tracer.clock.now());
        tracer.record(span.clone());
        Some(span)
    }
}

impl Drop for SpanBuilder {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

impl fmt::Debug for SpanBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanBuilder")
            .field("context", &self.context)
            .field("recording", &self.is_recording())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_keep_insertion_order_and_replace_in_place() {
        let mut attrs = Attributes::new();
        attrs.insert("b", 1_i64);
        attrs.insert("a", "x");
        attrs.insert("b", 2_i64);

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(attrs.get("b"), Some(&AttributeValue::Int(2)));
    }

    #[test]
    fn attribute_values_convert() {
        assert_eq!(AttributeValue::from(3_u32), AttributeValue::Int(3));
        assert_eq!(AttributeValue::from(u64::MAX), AttributeValue::Int(i64::MAX));
        assert_eq!(AttributeValue::from(0.5_f32), AttributeValue::Double(0.5));
        assert_eq!(
            AttributeValue::from(vec!["a", "b"]),
            AttributeValue::Array(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn attribute_values_stringify() {
        assert_eq!(AttributeValue::from("gpt-4").to_string(), "gpt-4");
        assert_eq!(AttributeValue::from(42_i64).to_string(), "42");
        assert_eq!(AttributeValue::from(true).to_string(), "true");
        assert_eq!(AttributeValue::from(vec![1_i64, 2]).to_string(), "[1,2]");
    }

    #[test]
    fn nan_double_renders_as_null() {
        assert!(AttributeValue::Double(f64::NAN).to_json().is_null());
    }
}
