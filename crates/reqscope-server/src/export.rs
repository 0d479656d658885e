//! Queued span export.
//!
//! `QueueExporter` is the tracer-facing half: `export` is called on the
//! request path and never blocks, so a full or closed queue drops the span
//! and counts it. `ExportWorker` drains the queue into an async `SpanSink`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqscope_core::error::{Result, ScopeError};
use reqscope_core::trace::{SpanData, SpanExporter};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Destination of exported spans.
#[async_trait]
pub trait SpanSink: Send + Sync + 'static {
    async fn send(&self, span: SpanData) -> Result<()>;
}

/// Writes each span as one JSON log line.
#[derive(Debug, Clone)]
pub struct LogSink {
    service: String,
}

impl LogSink {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl SpanSink for LogSink {
    async fn send(&self, span: SpanData) -> Result<()> {
        let json = serde_json::to_string(&span)
            .map_err(|e| ScopeError::Internal(format!("span encode failed: {e}")))?;
        tracing::info!(
            target: "reqscope::spans",
            service = %self.service,
            trace_id = %span.context.trace_id(),
            span = %json,
            "span"
        );
        Ok(())
    }
}

#[derive(Debug)]
pub struct QueueExporter {
    tx: mpsc::Sender<SpanData>,
    dropped: AtomicU64,
}

impl QueueExporter {
    /// Bounded queue of `capacity` spans (at least one). The receiver goes to
    /// [`ExportWorker::spawn`] or is drained directly.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SpanData>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Spans dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl SpanExporter for QueueExporter {
    fn export(&self, span: SpanData) {
        match self.tx.try_send(span) {
            Ok(()) => {}
            Err(TrySendError::Full(span)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(name = %span.name, "span export queue full, span dropped");
            }
            Err(TrySendError::Closed(span)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(name = %span.name, "span export queue closed, span dropped");
            }
        }
    }
}

/// Background task draining a span queue into a sink.
///
/// Exits once every `QueueExporter` sender is dropped and the queue is empty.
#[derive(Debug)]
pub struct ExportWorker {
    join: JoinHandle<u64>,
}

impl ExportWorker {
    pub fn spawn<S: SpanSink>(mut rx: mpsc::Receiver<SpanData>, sink: S) -> Self {
        let join = tokio::spawn(async move {
            let mut exported = 0u64;
            while let Some(span) = rx.recv().await {
                let name = span.name.clone();
                match sink.send(span).await {
                    Ok(()) => {
                        exported += 1;
                        tracing::debug!(%name, "span exported");
                    }
                    Err(e) => {
                        tracing::warn!(code = e.code().as_str(), error = %e, %name, "span sink failed, span dropped");
                    }
                }
            }
            exported
        });
        Self { join }
    }

    /// Wait for the queue to drain. Returns the number of spans the sink
    /// accepted.
    pub async fn join(self) -> u64 {
        match self.join.await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "span export worker failed");
                0
            }
        }
    }
}

/// Queue plus worker in one step.
pub fn spawn_queue<S: SpanSink>(capacity: usize, sink: S) -> (Arc<QueueExporter>, ExportWorker) {
    let (exporter, rx) = QueueExporter::new(capacity);
    (Arc::new(exporter), ExportWorker::spawn(rx, sink))
}
