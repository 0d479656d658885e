//! Span-tree tracing model.
//!
//! A `Tracer` starts spans either as trace roots (consulting its `Sampler`)
//! or as children of an explicitly passed `SpanContext`. Spans are owned
//! values: `end(self)` consumes the span, and an un-ended span ends itself on
//! drop, so every started span is handed to the `SpanExporter` exactly once.

mod context;
mod export;
mod sampler;
mod span;
mod tracer;

pub use context::{SpanContext, SpanId, TraceId};
pub use export::{InMemoryExporter, NoopExporter, SpanExporter};
pub use sampler::{AlwaysSample, NeverSample, RatioSampler, Sampler};
pub use span::{Annotation, Attribute, AttributeValue, Span, SpanData, Status, StatusCode};
pub use tracer::Tracer;
