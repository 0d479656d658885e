use std::time::Instant;

use super::{Handler, HttpMetrics, Request, RequestContext, ResponseWriter, StatusRecorder};
use crate::trace::{Attribute, Span, Status, Tracer};

/// Status recorded when a handler fails, panics, or is dropped mid-flight
/// without having written a status.
const ERROR_STATUS: u16 = 500;

/// In-flight measurement of one request.
///
/// `finish` records the outcome. If the guard is dropped unfinished (the
/// handler panicked or its future was dropped) it records `ERROR_STATUS`
/// and ends the request span with an error status.
pub struct Observation {
    metrics: HttpMetrics,
    tracer: Tracer,
    method: String,
    path: String,
    start: Instant,
    span: Option<Span>,
}

impl Observation {
    /// Start timing and open the request span. Method and path are copied
    /// here, before the handler can touch the request.
    pub fn begin(metrics: &HttpMetrics, tracer: &Tracer, req: &Request) -> Self {
        let start = Instant::now();
        let span = tracer.start(format!("{} {}", req.method, req.path), req.parent.as_ref());
        Self {
            metrics: metrics.clone(),
            tracer: tracer.clone(),
            method: req.method.clone(),
            path: req.path.clone(),
            start,
            span: Some(span),
        }
    }

    /// Context to hand to the inner handler.
    pub fn context(&self) -> RequestContext {
        let span = match &self.span {
            Some(s) => s.context(),
            None => crate::trace::SpanContext::new_root(false),
        };
        RequestContext::new(self.tracer.clone(), span)
    }

    /// Record the final status; `error` marks the request span as failed.
    pub fn finish(mut self, status: u16, error: Option<&str>) {
        let span_status = match error {
            Some(msg) => Status::error(msg),
            None if status >= 500 => Status::error(format!("HTTP {status}")),
            None => Status::ok(),
        };
        self.complete(status, span_status);
    }

    fn complete(&mut self, status: u16, span_status: Status) {
        let elapsed = self.start.elapsed();
        self.metrics.record(&self.method, &self.path, status, elapsed);
        tracing::debug!(
            method = %self.method,
            path = %self.path,
            status,
            elapsed_us = elapsed.as_micros() as u64,
            "request observed"
        );

        if let Some(mut span) = self.span.take() {
            span.annotate(
                "response",
                vec![Attribute::new("http.status_code", i64::from(status))],
            );
            span.set_status(span_status);
            span.end();
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if self.span.is_none() {
            return;
        }
        let msg = if std::thread::panicking() {
            "handler panicked"
        } else {
            "request abandoned before completion"
        };
        tracing::warn!(method = %self.method, path = %self.path, "{msg}");
        self.complete(ERROR_STATUS, Status::error(msg));
    }
}

/// Wraps a handler with metrics and a per-request span.
pub struct InstrumentedHandler<H> {
    inner: H,
    metrics: HttpMetrics,
    tracer: Tracer,
}

impl<H> InstrumentedHandler<H> {
    pub fn new(inner: H, metrics: HttpMetrics, tracer: Tracer) -> Self {
        Self {
            inner,
            metrics,
            tracer,
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.metrics
    }
}

impl<H: Handler> InstrumentedHandler<H> {
    /// Serve one request through the inner handler. The inner result is
    /// returned unchanged.
    pub async fn handle(
        &self,
        req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> std::result::Result<(), H::Error> {
        let obs = Observation::begin(&self.metrics, &self.tracer, req);
        let cx = obs.context();

        let mut recorder = StatusRecorder::new(w);
        let result = self.inner.serve(&cx, req, &mut recorder).await;

        match &result {
            Ok(()) => obs.finish(recorder.status(), None),
            Err(e) => {
                let status = recorder.explicit_status().unwrap_or(ERROR_STATUS);
                obs.finish(status, Some(&e.to_string()));
            }
        }
        result
    }
}
