use parking_lot::Mutex;

use super::SpanData;

/// Receives every ended, sampled span exactly once.
///
/// Called on the request path right after `Span::end`, so implementations
/// must not block: queue or drop.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: SpanData);
}

/// Discards spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: SpanData) {}
}

/// Keeps spans in memory. Useful for tests and local inspection.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    spans: Mutex<Vec<SpanData>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything exported so far, in export order.
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().clone()
    }

    /// Drain exported spans.
    pub fn take(&self) -> Vec<SpanData> {
        std::mem::take(&mut *self.spans.lock())
    }

    pub fn len(&self) -> usize {
        self.spans.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.lock().is_empty()
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: SpanData) {
        self.spans.lock().push(span);
    }
}
