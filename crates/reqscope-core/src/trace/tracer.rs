use std::fmt;
use std::sync::Arc;

use super::{
    AlwaysSample, NeverSample, NoopExporter, Sampler, Span, SpanContext, SpanExporter, SpanId,
    TraceId,
};

/// Starts spans. Cheap to clone.
#[derive(Clone)]
pub struct Tracer {
    sampler: Arc<dyn Sampler>,
    exporter: Arc<dyn SpanExporter>,
}

impl Tracer {
    pub fn new(sampler: Arc<dyn Sampler>, exporter: Arc<dyn SpanExporter>) -> Self {
        Self { sampler, exporter }
    }

    /// Always samples into the given exporter.
    pub fn always(exporter: Arc<dyn SpanExporter>) -> Self {
        Self::new(Arc::new(AlwaysSample), exporter)
    }

    /// Records nothing; spans still carry ids for propagation.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NeverSample), Arc::new(NoopExporter))
    }

    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    /// Start a span. With a parent the span joins the parent's trace and
    /// inherits its sampling decision; without one it becomes a trace root
    /// and the sampler decides.
    pub fn start(&self, name: impl Into<String>, parent: Option<&SpanContext>) -> Span {
        let (context, parent_id) = match parent {
            Some(p) => (p.child(), Some(p.span_id())),
            None => {
                let trace_id = TraceId::random();
                let sampled = self.sampler.should_sample(trace_id);
                (SpanContext::new(trace_id, SpanId::random(), sampled), None)
            }
        };
        Span::new(name.into(), context, parent_id, Arc::clone(&self.exporter))
    }

    /// Start a trace root.
    pub fn start_root(&self, name: impl Into<String>) -> Span {
        self.start(name, None)
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("sampler", &self.sampler)
            .finish_non_exhaustive()
    }
}
