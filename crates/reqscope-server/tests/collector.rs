#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqscope_core::error::ScopeError;
use reqscope_core::metrics::{Opts, Registry};
use reqscope_server::collector::BackgroundCollector;
use reqscope_server::synthetic::{self, SyntheticLoad, SYNTHETIC_METHOD};

#[tokio::test(start_paused = true)]
async fn ticks_once_per_period_until_stopped() {
    let registry = Registry::new();
    let heartbeat = synthetic::register_heartbeat(&registry, "myapp").unwrap();

    let counter = heartbeat.clone();
    let handle = BackgroundCollector::spawn("heartbeat", Duration::from_secs(1), move || {
        counter.inc(&[])
    });
    assert_eq!(handle.name(), "heartbeat");

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(heartbeat.get(&[]), Some(3));

    handle.stop().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(heartbeat.get(&[]), Some(3));
    assert!(registry.render().contains("myapp_heartbeat_total 3\n"));
}

#[tokio::test(start_paused = true)]
async fn errors_do_not_stop_the_loop() {
    let calls = Arc::new(AtomicU64::new(0));
    let seen = calls.clone();
    let handle = BackgroundCollector::spawn("flaky", Duration::from_millis(100), move || {
        let n = seen.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 0 {
            Err(ScopeError::Internal("odd tick".into()))
        } else {
            Ok(())
        }
    });

    tokio::time::sleep(Duration::from_millis(1050)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert!(!handle.is_finished());
    handle.stop().await;
}

#[tokio::test]
async fn stop_is_prompt_between_ticks() {
    let handle = BackgroundCollector::spawn("slow", Duration::from_secs(3600), || Ok(()));
    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("stop must not wait for the next tick");
}

#[tokio::test(start_paused = true)]
async fn dropping_the_handle_stops_the_loop() {
    let calls = Arc::new(AtomicU64::new(0));
    let seen = calls.clone();
    let handle = BackgroundCollector::spawn("dropped", Duration::from_millis(100), move || {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    tokio::time::sleep(Duration::from_millis(250)).await;
    drop(handle);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn panicking_task_is_contained() {
    let handle = BackgroundCollector::spawn("boom", Duration::from_millis(10), || -> reqscope_core::Result<()> {
        panic!("collector bug")
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.is_finished());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn synthetic_load_records_every_tick() {
    let registry = Registry::new();
    let load = SyntheticLoad::register(&registry, "myapp").unwrap();

    let tick = load.clone();
    let handle = BackgroundCollector::spawn("synthetic_load", Duration::from_millis(200), move || {
        tick.tick()
    });
    tokio::time::sleep(Duration::from_millis(1100)).await;
    handle.stop().await;

    let h = load.latency().get(&[SYNTHETIC_METHOD]).unwrap();
    assert_eq!(h.count, 5);
    // 0..20 ms always lands at or below the 25 ms boundary.
    assert_eq!(h.buckets[1], 5);
    let lines = load.lines_in().get(&[]).unwrap();
    assert!((500..1000).contains(&lines), "{lines}");
    assert!(load.bytes_in().get(&[]).unwrap() < 50_000);

    let text = registry.render();
    assert!(text.contains("# TYPE myapp_latency_milliseconds histogram"));
    assert!(text.contains("myapp_latency_milliseconds_bucket{method=\"synthetic\",le=\"10000\"} 5"));
    assert!(text.contains("myapp_lines_in_total "));
}

#[test]
fn registering_twice_is_a_duplicate() {
    let registry = Registry::new();
    SyntheticLoad::register(&registry, "myapp").unwrap();
    let err = SyntheticLoad::register(&registry, "myapp").unwrap_err();
    assert_eq!(err.code().as_str(), "DUPLICATE");

    registry
        .counter_vec(Opts::new("heartbeat_total", "taken").namespace("other"), &[])
        .unwrap();
    synthetic::register_heartbeat(&registry, "myapp").unwrap();
}
