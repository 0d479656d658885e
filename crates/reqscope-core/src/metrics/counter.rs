use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{Collect, SeriesValues};
use crate::error::Result;
use crate::labels::LabelKey;

/// One monotonically increasing series.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, v: u64) {
        self.value.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter family keyed by label values.
#[derive(Debug)]
pub struct CounterVec {
    name: String,
    label_names: Vec<String>,
    map: DashMap<LabelKey, Arc<Counter>>,
}

impl CounterVec {
    pub(crate) fn new(name: String, label_names: Vec<String>) -> Self {
        Self {
            name,
            label_names,
            map: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Series for the given label values, created on first use.
    ///
    /// The returned handle can be kept and updated without touching the map
    /// again.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Arc<Counter>> {
        let key = LabelKey::for_family(&self.name, &self.label_names, values)?;
        if let Some(existing) = self.map.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let entry = self.map.entry(key).or_insert_with(|| Arc::new(Counter::default()));
        Ok(Arc::clone(entry.value()))
    }

    /// Increment by 1.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.inc_by(values, 1)
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, values: &[&str], v: u64) -> Result<()> {
        self.with_label_values(values)?.inc_by(v);
        Ok(())
    }

    /// Current value of a series; `None` if it was never observed.
    pub fn get(&self, values: &[&str]) -> Option<u64> {
        let key = LabelKey::for_family(&self.name, &self.label_names, values).ok()?;
        self.map.get(&key).map(|c| c.value().get())
    }

    /// Detached copy of every series.
    pub fn snapshot(&self) -> Vec<(LabelKey, u64)> {
        self.map
            .iter()
            .map(|r| (r.key().clone(), r.value().get()))
            .collect()
    }
}

impl Collect for CounterVec {
    fn collect(&self) -> SeriesValues {
        SeriesValues::Counter(self.snapshot())
    }
}
