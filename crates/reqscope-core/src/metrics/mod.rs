//! Label-keyed metric families.
//!
//! Counter and histogram vectors are backed by `DashMap` so the first
//! observation of a new label key never blocks updates to keys that already
//! exist in other shards. Counters are plain atomics; histogram series carry
//! their own small mutex so a snapshot of one series is always internally
//! consistent (buckets, sum and count agree).

pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod registry;

use std::sync::Arc;

use crate::labels::LabelKey;

pub use counter::{Counter, CounterVec};
pub use gauge::{BuildInfo, GaugeFunc};
pub use histogram::{Histogram, HistogramVec, DEFAULT_BUCKETS};
pub use registry::Registry;

/// Name/help pair for a metric family, with an optional namespace prefix.
#[derive(Debug, Clone)]
pub struct Opts {
    pub namespace: Option<String>,
    pub name: String,
    pub help: String,
}

impl Opts {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            help: help.into(),
        }
    }

    pub fn namespace(mut self, ns: impl Into<String>) -> Self {
        let ns = ns.into();
        self.namespace = if ns.is_empty() { None } else { Some(ns) };
        self
    }

    /// `namespace_name`, or just `name` without a namespace.
    pub fn fq_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}_{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
    Gauge,
}

impl MetricKind {
    /// Value of the `# TYPE` line.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// Detached copy of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Finite upper bounds, ascending. `+Inf` is implicit and equals `count`.
    pub bounds: Arc<[f64]>,
    /// Cumulative count per bound.
    pub buckets: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

/// All series of one family at gather time.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesValues {
    Counter(Vec<(LabelKey, u64)>),
    Gauge(Vec<(LabelKey, f64)>),
    Histogram(Vec<(LabelKey, HistogramSnapshot)>),
}

impl SeriesValues {
    pub fn kind(&self) -> MetricKind {
        match self {
            SeriesValues::Counter(_) => MetricKind::Counter,
            SeriesValues::Gauge(_) => MetricKind::Gauge,
            SeriesValues::Histogram(_) => MetricKind::Histogram,
        }
    }
}

/// One family as produced by `Registry::gather`.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub values: SeriesValues,
}

impl FamilySnapshot {
    pub fn kind(&self) -> MetricKind {
        self.values.kind()
    }
}

/// Anything the registry can snapshot on a pull.
pub trait Collect: Send + Sync {
    fn collect(&self) -> SeriesValues;
}
