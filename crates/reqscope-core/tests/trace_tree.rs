//! Span trees, sampling, status and annotations.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use reqscope_core::trace::{
    Attribute, AttributeValue, InMemoryExporter, NeverSample, RatioSampler, Sampler, SpanContext,
    Status, StatusCode, TraceId, Tracer,
};

fn do_work(tracer: &Tracer, parent: &SpanContext, payload: &[u8]) {
    let mut span = tracer.start("doWork", Some(parent));
    match payload.first() {
        Some(b) => span.annotate(
            "Invoking doWork",
            vec![Attribute::new("bytes to int", i64::from(*b))],
        ),
        None => span.set_status(Status::unknown("empty payload")),
    }
    span.end();
}

#[test]
fn main_with_two_sequential_children() {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::always(exporter.clone());

    let main = tracer.start_root("main");
    let main_ctx = main.context();
    do_work(&tracer, &main_ctx, &[0xFF]);
    do_work(&tracer, &main_ctx, &[]);
    main.end();

    let spans = exporter.take();
    assert_eq!(spans.len(), 3);
    let (first, second, root) = (&spans[0], &spans[1], &spans[2]);

    assert_eq!(root.name, "main");
    assert!(root.is_root());
    for child in [first, second] {
        assert_eq!(child.name, "doWork");
        assert_eq!(child.context.trace_id(), root.context.trace_id());
        assert_eq!(child.parent_span_id, Some(root.context.span_id()));
        assert_ne!(child.context.span_id(), root.context.span_id());
        assert!(child.end <= root.end);
    }
    assert!(first.end <= second.start);

    assert_eq!(first.status.code, StatusCode::Ok);
    assert_eq!(first.annotations.len(), 1);
    assert_eq!(first.annotations[0].message, "Invoking doWork");
    assert_eq!(first.annotations[0].attributes[0].value, AttributeValue::Int(255));

    assert_eq!(second.status.code, StatusCode::Unknown);
    assert_eq!(second.status.message.as_deref(), Some("empty payload"));
}

#[test]
fn dropped_span_ends_exactly_once() {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::always(exporter.clone());
    {
        let mut span = tracer.start_root("scoped");
        span.set_status(Status::error("first"));
        span.set_status(Status::error("last"));
    }
    let spans = exporter.take();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status.message.as_deref(), Some("last"));
}

#[test]
fn span_abandoned_by_panic_is_exported_with_error() {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::always(exporter.clone());

    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _span = tracer.start_root("doomed");
        panic!("boom");
    }));
    assert!(res.is_err());

    let spans = exporter.take();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, Status::error("panicked"));
}

#[test]
fn unsampled_traces_propagate_but_do_not_export() {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::new(Arc::new(NeverSample), exporter.clone());

    let mut root = tracer.start_root("quiet");
    assert!(!root.is_recording());
    root.annotate("ignored", vec![]);
    let child = tracer.start("child", Some(&root.context()));
    assert!(!child.context().is_sampled());
    assert_eq!(child.context().trace_id(), root.context().trace_id());
    child.end();
    root.end();

    assert!(exporter.is_empty());
}

#[test]
fn ratio_sampler_is_deterministic_and_bounded() {
    let half = RatioSampler::new(0.5);
    assert!(half.should_sample(TraceId::from_u128(1)));
    assert!(!half.should_sample(TraceId::from_u128(u64::MAX as u128)));

    let id = TraceId::random();
    assert_eq!(half.should_sample(id), half.should_sample(id));

    assert!(RatioSampler::new(1.5).should_sample(TraceId::from_u128(u64::MAX as u128)));
    assert!(!RatioSampler::new(-1.0).should_sample(TraceId::from_u128(1)));
    assert_eq!(RatioSampler::new(f64::NAN).ratio(), 0.0);

    let sampled = (0..10_000)
        .filter(|_| half.should_sample(TraceId::random()))
        .count();
    assert!((4_000..6_000).contains(&sampled), "sampled {sampled}");
}

#[test]
fn span_data_serializes_ids_as_hex() {
    let exporter = Arc::new(InMemoryExporter::new());
    let tracer = Tracer::always(exporter.clone());
    let mut span = tracer.start_root("json");
    span.annotate("note", vec![Attribute::new("ok", true), Attribute::new("who", "me")]);
    span.end();

    let data = exporter.take().remove(0);
    let v = serde_json::to_value(&data).unwrap();
    assert_eq!(v["context"]["trace_id"].as_str().unwrap().len(), 32);
    assert_eq!(v["context"]["span_id"].as_str().unwrap().len(), 16);
    assert_eq!(v["status"]["code"], "ok");
    assert_eq!(v["annotations"][0]["attributes"][1]["value"], "me");
    assert!(v["parent_span_id"].is_null());
}
