//! Span sinks and log setup
//!
//! Patterns report what they do through a [`TraceSink`]: named spans with
//! key-value attributes. Sinks are observational. A pattern behaves the
//! same with a [`NoopSink`], a [`LogSink`] that forwards to `tracing`, or a
//! [`RecordingSink`] that keeps everything in memory for inspection.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use composer_core::telemetry::{kv, RecordingSink, SpanScope, TraceSink};
//!
//! let recorder = Arc::new(RecordingSink::new());
//! let sink: Arc<dyn TraceSink> = recorder.clone();
//! {
//!     let span = SpanScope::enter(&sink, "translate_product", &[kv("product_id", 1)]);
//!     span.record("languages_completed", 3);
//! }
//! assert!(recorder.named("translate_product")[0].is_closed());
//! ```

mod logging;
mod recording;
mod sink;

pub use logging::init_logging;
pub use recording::{RecordedSpan, RecordingSink};
pub use sink::{kv, AttributeValue, KeyValue, LogSink, NoopSink, SpanId, SpanScope, TraceSink};
