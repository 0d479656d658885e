//! Counter vectors under concurrent updates.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use reqscope_core::metrics::{Opts, Registry};

#[test]
fn no_lost_updates_under_contention() {
    let registry = Registry::new();
    let requests = registry
        .counter_vec(Opts::new("stress_total", "stress"), &["method", "path"])
        .unwrap();

    const THREADS: u64 = 16;
    const PER_THREAD: u64 = 10_000;
    let paths = ["/", "/greet", "/work", "/metrics"];

    thread::scope(|s| {
        for t in 0..THREADS {
            let requests = &requests;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    let path = paths[((t + i) % paths.len() as u64) as usize];
                    requests.inc_by(&["GET", path], 1 + (i % 3)).unwrap();
                }
            });
        }
    });

    let expected: u64 = (0..THREADS)
        .map(|_| (0..PER_THREAD).map(|i| 1 + (i % 3)).sum::<u64>())
        .sum();
    let observed: u64 = requests.snapshot().iter().map(|(_, v)| *v).sum();
    assert_eq!(observed, expected);
    assert_eq!(requests.snapshot().len(), paths.len());
}

#[test]
fn racing_first_access_creates_one_series() {
    let registry = Registry::new();
    let vec = registry
        .counter_vec(Opts::new("race_total", "race"), &["key"])
        .unwrap();

    let handles: Vec<_> = thread::scope(|s| {
        let spawned: Vec<_> = (0..32)
            .map(|_| s.spawn(|| vec.with_label_values(&["fresh"]).unwrap()))
            .collect();
        spawned.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for h in &handles {
        h.inc();
        assert!(Arc::ptr_eq(h, &handles[0]));
    }
    assert_eq!(vec.get(&["fresh"]), Some(32));
    assert_eq!(vec.snapshot().len(), 1);
}

#[test]
fn label_arity_mismatch_is_an_error() {
    let registry = Registry::new();
    let vec = registry
        .counter_vec(Opts::new("arity_total", "arity"), &["method", "path"])
        .unwrap();

    let err = vec.inc(&["GET"]).expect_err("one value for two labels");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");
    assert!(vec.snapshot().is_empty());
}

#[test]
fn unobserved_series_reads_none() {
    let registry = Registry::new();
    let vec = registry
        .counter_vec(Opts::new("lazy_total", "lazy"), &["status"])
        .unwrap();
    assert_eq!(vec.get(&["200"]), None);
    vec.inc(&["200"]).unwrap();
    assert_eq!(vec.get(&["200"]), Some(1));
}
