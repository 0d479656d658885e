//! Request instrumentation: counters, status capture, spans, failure paths.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use reqscope_core::instrument::{
    BufferedResponse, Handler, HttpMetrics, HttpMetricsOpts, InstrumentedHandler, Request,
    RequestContext, RequestLabels, ResponseWriter,
};
use reqscope_core::metrics::Registry;
use reqscope_core::trace::{InMemoryExporter, StatusCode, Tracer};

#[derive(Clone, Copy)]
enum Behavior {
    Body(&'static str),
    Status(u16),
    StatusTwice(u16, u16),
    BodyThenStatus,
    Fail,
    FailAfterStatus(u16),
    Panic,
}

struct Scripted {
    behavior: Behavior,
}

#[async_trait]
impl Handler for Scripted {
    type Error = String;

    async fn serve(
        &self,
        _cx: &RequestContext,
        _req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), String> {
        match self.behavior {
            Behavior::Body(b) => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                w.write_body(b.as_bytes());
                Ok(())
            }
            Behavior::Status(s) => {
                w.write_status(s);
                Ok(())
            }
            Behavior::StatusTwice(a, b) => {
                w.write_status(a);
                w.write_status(b);
                Ok(())
            }
            Behavior::BodyThenStatus => {
                w.write_body(b"early");
                w.write_status(404);
                Ok(())
            }
            Behavior::Fail => Err("parse failed".to_string()),
            Behavior::FailAfterStatus(s) => {
                w.write_status(s);
                Err("gone".to_string())
            }
            Behavior::Panic => panic!("handler exploded"),
        }
    }
}

struct Fixture {
    metrics: HttpMetrics,
    exporter: Arc<InMemoryExporter>,
    tracer: Tracer,
}

fn fixture(opts: HttpMetricsOpts) -> Fixture {
    let registry = Registry::new();
    let metrics = HttpMetrics::register(&registry, &opts).unwrap();
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::always(exporter.clone());
    Fixture {
        metrics,
        exporter,
        tracer,
    }
}

impl Fixture {
    fn wrap(&self, behavior: Behavior) -> InstrumentedHandler<Scripted> {
        InstrumentedHandler::new(Scripted { behavior }, self.metrics.clone(), self.tracer.clone())
    }
}

#[tokio::test]
async fn greet_request_updates_all_three_families() {
    let fx = fixture(HttpMetricsOpts::default());
    let handler = fx.wrap(Behavior::Body("hello world"));

    let mut w = BufferedResponse::new();
    handler
        .handle(&Request::new("GET", "/greet"), &mut w)
        .await
        .unwrap();

    assert_eq!(w.status(), 200);
    assert_eq!(w.body(), b"hello world");

    let m = handler.metrics();
    assert_eq!(m.requests().get(&["GET", "/greet"]), Some(1));
    assert_eq!(m.statuses().get(&["200"]), Some(1));
    let h = m.latency().get(&["/greet"]).unwrap();
    assert_eq!(h.count, 1);
    assert!(h.sum >= 0.005, "slept 5ms, observed {}s", h.sum);

    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "GET /greet");
    assert!(spans[0].is_root());
    assert_eq!(spans[0].status.code, StatusCode::Ok);
}

#[tokio::test]
async fn unset_status_defaults_to_200() {
    let fx = fixture(HttpMetricsOpts::default());
    let handler = fx.wrap(Behavior::Body(""));
    let mut w = BufferedResponse::new();
    handler.handle(&Request::new("GET", "/"), &mut w).await.unwrap();
    assert_eq!(fx.metrics.statuses().get(&["200"]), Some(1));
}

#[tokio::test]
async fn first_status_wins() {
    let fx = fixture(HttpMetricsOpts::default());

    let mut w = BufferedResponse::new();
    fx.wrap(Behavior::StatusTwice(201, 500))
        .handle(&Request::new("POST", "/items"), &mut w)
        .await
        .unwrap();
    assert_eq!(fx.metrics.statuses().get(&["201"]), Some(1));
    assert_eq!(fx.metrics.statuses().get(&["500"]), None);

    let mut w = BufferedResponse::new();
    fx.wrap(Behavior::BodyThenStatus)
        .handle(&Request::new("GET", "/late"), &mut w)
        .await
        .unwrap();
    assert_eq!(w.status(), 200);
    assert_eq!(fx.metrics.statuses().get(&["200"]), Some(1));
    assert_eq!(fx.metrics.statuses().get(&["404"]), None);

    let mut w = BufferedResponse::new();
    fx.wrap(Behavior::Status(404))
        .handle(&Request::new("GET", "/missing"), &mut w)
        .await
        .unwrap();
    assert_eq!(fx.metrics.statuses().get(&["404"]), Some(1));
}

#[tokio::test]
async fn handler_error_is_returned_unchanged_and_recorded_as_500() {
    let fx = fixture(HttpMetricsOpts::default());
    let mut w = BufferedResponse::new();

    let err = fx
        .wrap(Behavior::Fail)
        .handle(&Request::new("GET", "/parse"), &mut w)
        .await
        .expect_err("inner error propagates");
    assert_eq!(err, "parse failed");

    assert_eq!(fx.metrics.statuses().get(&["500"]), Some(1));
    assert_eq!(fx.metrics.requests().get(&["GET", "/parse"]), Some(1));

    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status.code, StatusCode::Error);
    assert_eq!(spans[0].status.message.as_deref(), Some("parse failed"));
}

#[tokio::test]
async fn handler_error_keeps_explicit_status() {
    let fx = fixture(HttpMetricsOpts::default());
    let mut w = BufferedResponse::new();
    let _ = fx
        .wrap(Behavior::FailAfterStatus(410))
        .handle(&Request::new("GET", "/old"), &mut w)
        .await;
    assert_eq!(fx.metrics.statuses().get(&["410"]), Some(1));
    assert_eq!(fx.metrics.statuses().get(&["500"]), None);
}

#[tokio::test]
async fn panicking_handler_still_records_status_duration_and_span() {
    let fx = fixture(HttpMetricsOpts::default());
    let handler = Arc::new(fx.wrap(Behavior::Panic));

    let h = handler.clone();
    let joined = tokio::spawn(async move {
        let mut w = BufferedResponse::new();
        h.handle(&Request::new("GET", "/boom"), &mut w).await
    })
    .await;
    assert!(joined.unwrap_err().is_panic());

    let m = handler.metrics();
    assert_eq!(m.statuses().get(&["500"]), Some(1));
    assert_eq!(m.requests().get(&["GET", "/boom"]), Some(1));
    assert_eq!(m.latency().get(&["/boom"]).unwrap().count, 1);

    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status.code, StatusCode::Error);
    assert_eq!(spans[0].status.message.as_deref(), Some("handler panicked"));
}

#[tokio::test]
async fn dropped_request_future_is_recorded_as_abandoned() {
    let fx = fixture(HttpMetricsOpts::default());
    let handler = fx.wrap(Behavior::Body("slow"));

    let mut w = BufferedResponse::new();
    let req = Request::new("GET", "/slow");
    let res = tokio::time::timeout(Duration::from_millis(1), handler.handle(&req, &mut w)).await;
    assert!(res.is_err());

    assert_eq!(fx.metrics.statuses().get(&["500"]), Some(1));
    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        spans[0].status.message.as_deref(),
        Some("request abandoned before completion")
    );
}

#[tokio::test]
async fn path_only_request_labels() {
    let fx = fixture(HttpMetricsOpts {
        request_labels: RequestLabels::Path,
        ..HttpMetricsOpts::default()
    });
    let mut w = BufferedResponse::new();
    fx.wrap(Behavior::Status(200))
        .handle(&Request::new("GET", "/"), &mut w)
        .await
        .unwrap();
    assert_eq!(fx.metrics.requests().label_names(), ["path".to_string()]);
    assert_eq!(fx.metrics.requests().get(&["/"]), Some(1));
}

/// Creates child spans and fails at a point chosen by the request id.
struct Flaky {
    started: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for Flaky {
    type Error = String;

    async fn serve(
        &self,
        cx: &RequestContext,
        req: &Request,
        w: &mut dyn ResponseWriter,
    ) -> Result<(), String> {
        let id: usize = req.query_param("id").unwrap().parse().unwrap();

        self.started.fetch_add(1, Ordering::SeqCst);
        let outer = cx.start_span("load");
        tokio::task::yield_now().await;

        if id % 5 == 1 {
            return Err(format!("request {id} failed while loading"));
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let nested = cx.with_span(outer.context()).start_span("decode");
        if id % 5 == 2 {
            panic!("request {id} panicked while decoding");
        }
        tokio::task::yield_now().await;
        nested.end();
        outer.end();

        if id % 5 == 3 {
            return Err(format!("request {id} failed after work"));
        }
        w.write_status(200);
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_open_spans_leak_under_concurrent_failures() {
    let fx = fixture(HttpMetricsOpts::default());
    let started = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(InstrumentedHandler::new(
        Flaky {
            started: started.clone(),
        },
        fx.metrics.clone(),
        fx.tracer.clone(),
    ));

    const N: usize = 200;
    let tasks: Vec<_> = (0..N)
        .map(|id| {
            let h = handler.clone();
            tokio::spawn(async move {
                let mut w = BufferedResponse::new();
                let req = Request::new("GET", "/flaky").with_query(format!("id={id}"));
                h.handle(&req, &mut w).await
            })
        })
        .collect();

    let mut panics = 0;
    for t in tasks {
        if let Err(e) = t.await {
            assert!(e.is_panic());
            panics += 1;
        }
    }
    assert_eq!(panics, N / 5);

    // One request span per request plus every child span that was started.
    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), N + started.load(Ordering::SeqCst));

    let statuses = fx.metrics.statuses();
    let total: u64 = statuses.snapshot().iter().map(|(_, v)| *v).sum();
    assert_eq!(total, N as u64);
    assert_eq!(statuses.get(&["500"]), Some((3 * N / 5) as u64));
    assert_eq!(statuses.get(&["200"]), Some((2 * N / 5) as u64));

    let roots: Vec<_> = spans.iter().filter(|s| s.is_root()).collect();
    assert_eq!(roots.len(), N);
    for child in spans.iter().filter(|s| !s.is_root()) {
        assert!(roots
            .iter()
            .any(|r| r.context.trace_id() == child.context.trace_id()));
    }
}

#[tokio::test]
async fn propagated_parent_is_used_for_the_request_span() {
    let fx = fixture(HttpMetricsOpts::default());
    let upstream = fx.tracer.start_root("upstream");
    let parent = upstream.context();

    let mut w = BufferedResponse::new();
    fx.wrap(Behavior::Status(204))
        .handle(&Request::new("GET", "/child").with_parent(parent), &mut w)
        .await
        .unwrap();
    upstream.end();

    let spans = fx.exporter.spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].parent_span_id, Some(parent.span_id()));
    assert_eq!(spans[0].context.trace_id(), parent.trace_id());
}
