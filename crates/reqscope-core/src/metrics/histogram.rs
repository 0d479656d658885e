use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{Collect, HistogramSnapshot, SeriesValues};
use crate::error::{Result, ScopeError};
use crate::labels::LabelKey;

/// Default latency boundaries in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Boundaries must be non-empty, finite and strictly ascending.
pub fn validate_buckets(bounds: &[f64]) -> Result<()> {
    if bounds.is_empty() {
        return Err(ScopeError::InvalidBuckets("no boundaries".into()));
    }
    if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(ScopeError::InvalidBuckets(format!(
            "boundary {b} is not finite (+Inf is implicit)"
        )));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ScopeError::InvalidBuckets(format!(
            "boundaries not strictly ascending at {} >= {}",
            w[0], w[1]
        )));
    }
    Ok(())
}

#[derive(Debug)]
struct HistogramState {
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

/// One histogram series. Boundaries are shared with the rest of the family.
#[derive(Debug)]
pub struct Histogram {
    bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

impl Histogram {
    fn new(bounds: Arc<[f64]>) -> Self {
        let buckets = vec![0; bounds.len()];
        Self {
            bounds,
            state: Mutex::new(HistogramState {
                buckets,
                sum: 0.0,
                count: 0,
            }),
        }
    }

    /// Record one sample. Cumulative: every bucket with `bound >= v` counts it.
    pub fn observe(&self, v: f64) {
        if v.is_nan() {
            tracing::warn!("histogram sample is NaN, dropped");
            return;
        }
        // First bucket that holds v; all buckets after it hold v as well.
        let first = self.bounds.partition_point(|b| *b < v);

        let mut st = self.state.lock();
        st.sum += v;
        st.count += 1;
        for b in &mut st.buckets[first..] {
            *b += 1;
        }
    }

    /// Record a duration in seconds.
    pub fn observe_duration(&self, d: Duration) {
        self.observe(d.as_secs_f64());
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let st = self.state.lock();
        HistogramSnapshot {
            bounds: Arc::clone(&self.bounds),
            buckets: st.buckets.clone(),
            sum: st.sum,
            count: st.count,
        }
    }
}

/// Histogram family keyed by label values.
#[derive(Debug)]
pub struct HistogramVec {
    name: String,
    label_names: Vec<String>,
    bounds: Arc<[f64]>,
    map: DashMap<LabelKey, Arc<Histogram>>,
}

impl HistogramVec {
    pub(crate) fn new(name: String, label_names: Vec<String>, bounds: Arc<[f64]>) -> Self {
        Self {
            name,
            label_names,
            bounds,
            map: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Series for the given label values, created on first use.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Arc<Histogram>> {
        let key = LabelKey::for_family(&self.name, &self.label_names, values)?;
        if let Some(existing) = self.map.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let bounds = Arc::clone(&self.bounds);
        let entry = self
            .map
            .entry(key)
            .or_insert_with(|| Arc::new(Histogram::new(bounds)));
        Ok(Arc::clone(entry.value()))
    }

    pub fn observe(&self, values: &[&str], v: f64) -> Result<()> {
        self.with_label_values(values)?.observe(v);
        Ok(())
    }

    pub fn observe_duration(&self, values: &[&str], d: Duration) -> Result<()> {
        self.with_label_values(values)?.observe_duration(d);
        Ok(())
    }

    /// Snapshot of a single series; `None` if it was never observed.
    pub fn get(&self, values: &[&str]) -> Option<HistogramSnapshot> {
        let key = LabelKey::for_family(&self.name, &self.label_names, values).ok()?;
        self.map.get(&key).map(|h| h.value().snapshot())
    }

    /// Detached copy of every series, each one internally consistent.
    pub fn snapshot(&self) -> Vec<(LabelKey, HistogramSnapshot)> {
        // Collect handles first so no shard guard is held while locking series.
        let series: Vec<(LabelKey, Arc<Histogram>)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        series
            .into_iter()
            .map(|(k, h)| (k, h.snapshot()))
            .collect()
    }
}

impl Collect for HistogramVec {
    fn collect(&self) -> SeriesValues {
        SeriesValues::Histogram(self.snapshot())
    }
}
