//! Synthetic load generator and heartbeat families.
//!
//! Gives a freshly started server something to show on `/metrics` before
//! any real traffic arrives.

use std::sync::Arc;

use rand::Rng;
use reqscope_core::error::Result;
use reqscope_core::metrics::{CounterVec, HistogramVec, Opts, Registry};

/// Boundaries of `<ns>_latency_milliseconds`.
pub const LATENCY_MS_BUCKETS: [f64; 7] = [0.0, 25.0, 100.0, 200.0, 400.0, 800.0, 10_000.0];

/// Method label value used for synthetic latency samples.
pub const SYNTHETIC_METHOD: &str = "synthetic";

/// `<ns>_heartbeat_total`, bumped once per heartbeat collector tick.
pub fn register_heartbeat(registry: &Registry, namespace: &str) -> Result<Arc<CounterVec>> {
    registry.counter_vec(
        Opts::new("heartbeat_total", "Number of heartbeat collector ticks").namespace(namespace),
        &[],
    )
}

#[derive(Debug, Clone)]
pub struct SyntheticLoad {
    latency: Arc<HistogramVec>,
    lines_in: Arc<CounterVec>,
    bytes_in: Arc<CounterVec>,
}

impl SyntheticLoad {
    pub fn register(registry: &Registry, namespace: &str) -> Result<Self> {
        let latency = registry.histogram_vec(
            Opts::new("latency_milliseconds", "The distribution of the latencies")
                .namespace(namespace),
            &["method"],
            &LATENCY_MS_BUCKETS,
        )?;
        let lines_in = registry.counter_vec(
            Opts::new("lines_in_total", "The number of lines from standard input")
                .namespace(namespace),
            &[],
        )?;
        let bytes_in = registry.counter_vec(
            Opts::new("bytes_in_total", "The number of bytes received").namespace(namespace),
            &[],
        )?;
        Ok(Self {
            latency,
            lines_in,
            bytes_in,
        })
    }

    /// Record one round of fake traffic.
    pub fn tick(&self) -> Result<()> {
        let mut rng = rand::thread_rng();
        let latency_ms = rng.gen_range(0..20) as f64;
        let lines = rng.gen_range(100..200);
        let bytes = rng.gen_range(0..10_000);

        self.latency.observe(&[SYNTHETIC_METHOD], latency_ms)?;
        self.lines_in.inc_by(&[], lines)?;
        self.bytes_in.inc_by(&[], bytes)?;
        Ok(())
    }

    pub fn latency(&self) -> &HistogramVec {
        &self.latency
    }

    pub fn lines_in(&self) -> &CounterVec {
        &self.lines_in
    }

    pub fn bytes_in(&self) -> &CounterVec {
        &self.bytes_in
    }
}
