//! Trace sink trait and the built-in forwarding sinks

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

/// Identifier handed out by [`TraceSink::span_start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(Uuid);

impl SpanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute value attached to a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Int(v.into())
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(v.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<&String> for AttributeValue {
    fn from(v: &String) -> Self {
        AttributeValue::Str(v.clone())
    }
}

/// A span attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AttributeValue,
}

/// Shorthand for building a [`KeyValue`]
pub fn kv(key: impl Into<String>, value: impl Into<AttributeValue>) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: value.into(),
    }
}

/// Receiver for span start/end events.
///
/// Implementations must not fail and must not block for long; nothing a
/// pattern does depends on what a sink does with its events.
pub trait TraceSink: Send + Sync {
    /// Open a span and return its id
    fn span_start(&self, name: &str, attributes: &[KeyValue]) -> SpanId;

    /// Attach an attribute to an open span
    fn record(&self, span: SpanId, attribute: KeyValue);

    /// Close a span, attaching any final attributes
    fn span_end(&self, span: SpanId, attributes: &[KeyValue]);
}

/// RAII handle that closes its span when dropped.
pub struct SpanScope {
    sink: Arc<dyn TraceSink>,
    id: SpanId,
    ended: bool,
}

impl SpanScope {
    pub fn enter(sink: &Arc<dyn TraceSink>, name: &str, attributes: &[KeyValue]) -> Self {
        let id = sink.span_start(name, attributes);
        Self {
            sink: Arc::clone(sink),
            id,
            ended: false,
        }
    }

    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn record(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.sink.record(self.id, kv(key, value));
    }

    /// Close the span now with closing attributes.
    pub fn end(mut self, attributes: &[KeyValue]) {
        self.ended = true;
        self.sink.span_end(self.id, attributes);
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        if !self.ended {
            self.sink.span_end(self.id, &[]);
        }
    }
}

impl fmt::Debug for SpanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanScope").field("id", &self.id).finish()
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn span_start(&self, _name: &str, _attributes: &[KeyValue]) -> SpanId {
        SpanId::new()
    }

    fn record(&self, _span: SpanId, _attribute: KeyValue) {}

    fn span_end(&self, _span: SpanId, _attributes: &[KeyValue]) {}
}

/// Forwards span events to `tracing` at debug level, with elapsed time on close.
#[derive(Debug, Default)]
pub struct LogSink {
    open: Mutex<HashMap<SpanId, (String, Instant)>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

fn render(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .map(|a| format!("{}={}", a.key, a.value))
        .collect::<Vec<_>>()
        .join(" ")
}

impl TraceSink for LogSink {
    fn span_start(&self, name: &str, attributes: &[KeyValue]) -> SpanId {
        let id = SpanId::new();
        self.open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, (name.to_string(), Instant::now()));
        tracing::debug!(span = name, %id, attributes = %render(attributes), "span started");
        id
    }

    fn record(&self, span: SpanId, attribute: KeyValue) {
        tracing::debug!(%span, key = %attribute.key, value = %attribute.value, "span attribute");
    }

    fn span_end(&self, span: SpanId, attributes: &[KeyValue]) {
        let entry = self
            .open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&span);
        if let Some((name, started)) = entry {
            tracing::debug!(
                span = %name,
                id = %span,
                elapsed_ms = started.elapsed().as_millis() as u64,
                attributes = %render(attributes),
                "span finished"
            );
        }
    }
}
