//! Request instrumentation middleware.
//!
//! `InstrumentedHandler` wraps any `Handler`. Per call it captures the
//! method and path at entry, starts a timer and a request span, intercepts
//! the response status through a `StatusRecorder`, and on completion (or
//! unwind) updates the request/status counters and the latency histogram.
//! Instrumentation never changes the handler's own result.

mod http_metrics;
mod middleware;
mod writer;

use async_trait::async_trait;

use crate::trace::{Span, SpanContext, Tracer};

pub use http_metrics::{HttpMetrics, HttpMetricsOpts, RequestLabels};
pub use middleware::{InstrumentedHandler, Observation};
pub use writer::{BufferedResponse, ResponseWriter, StatusRecorder, DEFAULT_STATUS};

/// What the middleware knows about an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Normalized path (route template); used as a label value.
    pub path: String,
    pub query: Option<String>,
    /// Propagated parent span, if the caller already has one.
    pub parent: Option<SpanContext>,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            parent: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// First value of `key` in the query string.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .filter_map(|kv| kv.split_once('=').or(Some((kv, ""))))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

/// Carries the tracer and the active span to handlers explicitly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tracer: Tracer,
    span: SpanContext,
}

impl RequestContext {
    pub fn new(tracer: Tracer, span: SpanContext) -> Self {
        Self { tracer, span }
    }

    pub fn span_context(&self) -> SpanContext {
        self.span
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Child of the active span.
    pub fn start_span(&self, name: impl Into<String>) -> Span {
        self.tracer.start(name, Some(&self.span))
    }

    /// Same tracer, different active span (for deeper nesting).
    pub fn with_span(&self, span: SpanContext) -> Self {
        Self {
            tracer: self.tracer.clone(),
            span,
        }
    }
}

/// A request handler the middleware can wrap.
#[async_trait]
pub trait Handler: Send + Sync {
    type Error: std::fmt::Display + Send;

    async fn serve(
        &self,
        cx: &RequestContext,
        req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> std::result::Result<(), Self::Error>;
}
