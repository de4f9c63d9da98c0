//! In-memory sink for tests and offline inspection

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use super::sink::{AttributeValue, KeyValue, SpanId, TraceSink};
use crate::error::Result;

/// A span as seen by a [`RecordingSink`]
#[derive(Debug, Clone, Serialize)]
pub struct RecordedSpan {
    pub id: SpanId,
    pub name: String,
    pub attributes: Vec<KeyValue>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RecordedSpan {
    /// Latest value recorded under `key`
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.key == key)
            .map(|a| &a.value)
    }

    pub fn is_closed(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Keeps every span in start order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    spans: Mutex<Vec<RecordedSpan>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_spans<R>(&self, f: impl FnOnce(&mut Vec<RecordedSpan>) -> R) -> R {
        let mut guard = self
            .spans
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Snapshot of all spans
    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.with_spans(|spans| spans.clone())
    }

    /// Spans with the given name, in start order
    pub fn named(&self, name: &str) -> Vec<RecordedSpan> {
        self.with_spans(|spans| spans.iter().filter(|s| s.name == name).cloned().collect())
    }

    /// Span names in start order
    pub fn span_names(&self) -> Vec<String> {
        self.with_spans(|spans| spans.iter().map(|s| s.name.clone()).collect())
    }

    /// Pretty JSON export of everything recorded
    pub fn to_json(&self) -> Result<String> {
        let spans = self.spans();
        Ok(serde_json::to_string_pretty(&spans)?)
    }
}

impl TraceSink for RecordingSink {
    fn span_start(&self, name: &str, attributes: &[KeyValue]) -> SpanId {
        let id = SpanId::new();
        self.with_spans(|spans| {
            spans.push(RecordedSpan {
                id,
                name: name.to_string(),
                attributes: attributes.to_vec(),
                started_at: Utc::now(),
                ended_at: None,
            })
        });
        id
    }

    fn record(&self, span: SpanId, attribute: KeyValue) {
        self.with_spans(|spans| {
            if let Some(s) = spans.iter_mut().find(|s| s.id == span) {
                s.attributes.push(attribute);
            }
        });
    }

    fn span_end(&self, span: SpanId, attributes: &[KeyValue]) {
        self.with_spans(|spans| {
            if let Some(s) = spans.iter_mut().find(|s| s.id == span) {
                if s.ended_at.is_some() {
                    return;
                }
                s.attributes.extend_from_slice(attributes);
                s.ended_at = Some(Utc::now());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{kv, SpanScope};
    use std::sync::Arc;

    #[test]
    fn test_records_lifecycle() {
        let sink = RecordingSink::new();
        let id = sink.span_start("evaluate_pitch", &[kv("model", "llama")]);
        sink.record(id, kv("status", "PASS"));
        sink.record(id, kv("status", "NEEDS_IMPROVEMENT"));

        let span = &sink.named("evaluate_pitch")[0];
        assert!(!span.is_closed());
        assert_eq!(
            span.attribute("status"),
            Some(&AttributeValue::Str("NEEDS_IMPROVEMENT".into()))
        );

        sink.span_end(id, &[kv("passed", false)]);
        let span = &sink.spans()[0];
        assert!(span.is_closed());
        assert_eq!(span.attribute("passed"), Some(&AttributeValue::Bool(false)));

        // A closed span ignores a second close
        sink.span_end(id, &[kv("passed", true)]);
        assert_eq!(
            sink.spans()[0].attribute("passed"),
            Some(&AttributeValue::Bool(false))
        );
    }

    #[test]
    fn test_scope_end_attaches_attributes_once() {
        let recorder = Arc::new(RecordingSink::new());
        let sink: Arc<dyn TraceSink> = recorder.clone();

        let span = SpanScope::enter(&sink, "translate_product", &[kv("product_id", 1)]);
        span.end(&[kv("languages_completed", 2)]);

        let span = &recorder.named("translate_product")[0];
        assert!(span.is_closed());
        assert_eq!(span.attribute("languages_completed"), Some(&AttributeValue::Int(2)));
        assert_eq!(span.attributes.len(), 2);
    }

    #[test]
    fn test_scope_closes_on_drop() {
        let recorder = Arc::new(RecordingSink::new());
        let sink: Arc<dyn TraceSink> = recorder.clone();
        {
            let outer = SpanScope::enter(&sink, "outer", &[]);
            let _inner = SpanScope::enter(&sink, "inner", &[]);
            outer.record("done", true);
        }
        assert_eq!(recorder.span_names(), vec!["outer", "inner"]);
        assert!(recorder.spans().iter().all(|s| s.is_closed()));
    }

    #[test]
    fn test_json_export() {
        let sink = RecordingSink::new();
        sink.span_start("routing_pattern", &[kv("query_type", "product"), kv("confidence", 92)]);
        let json = sink.to_json().unwrap();
        assert!(json.contains("routing_pattern"));
        assert!(json.contains("\"confidence\""));
    }
}
