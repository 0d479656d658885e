//! Explicit metric registry.
//!
//! Constructed once at startup and shared by `Arc`. The family list is only
//! write-locked while registering; `gather` clones the list under a read
//! lock and snapshots each family afterwards, so a pull never holds a
//! registry-wide lock while series are being copied or rendered.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{
    BuildInfo, Collect, CounterVec, FamilySnapshot, GaugeFunc, HistogramVec, Opts,
};
use crate::error::{Result, ScopeError};
use crate::exposition;
use crate::labels::{validate_label_names, validate_metric_name, LabelKey};

#[derive(Clone)]
struct Family {
    name: String,
    help: String,
    collector: Arc<dyn Collect>,
}

#[derive(Default)]
pub struct Registry {
    families: RwLock<Vec<Family>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, name: String, help: String, collector: Arc<dyn Collect>) -> Result<()> {
        let mut families = self.families.write();
        if families.iter().any(|f| f.name == name) {
            return Err(ScopeError::Duplicate(name));
        }
        tracing::debug!(family = %name, "metric family registered");
        families.push(Family {
            name,
            help,
            collector,
        });
        Ok(())
    }

    /// Register a counter family with the given label names.
    pub fn counter_vec(&self, opts: Opts, labels: &[&str]) -> Result<Arc<CounterVec>> {
        let name = opts.fq_name();
        validate_metric_name(&name)?;
        let labels = owned(labels);
        validate_label_names(&labels)?;

        let vec = Arc::new(CounterVec::new(name.clone(), labels));
        self.register(name, opts.help, vec.clone())?;
        Ok(vec)
    }

    /// Register a histogram family. `bounds` are fixed for the family's lifetime.
    pub fn histogram_vec(
        &self,
        opts: Opts,
        labels: &[&str],
        bounds: &[f64],
    ) -> Result<Arc<HistogramVec>> {
        let name = opts.fq_name();
        validate_metric_name(&name)?;
        let labels = owned(labels);
        validate_label_names(&labels)?;
        if labels.iter().any(|l| l == "le") {
            return Err(ScopeError::InvalidName(
                "label name \"le\" is reserved for histogram buckets".into(),
            ));
        }
        super::histogram::validate_buckets(bounds)?;

        let vec = Arc::new(HistogramVec::new(name.clone(), labels, bounds.into()));
        self.register(name, opts.help, vec.clone())?;
        Ok(vec)
    }

    /// Register a gauge whose value is computed on every pull.
    pub fn gauge_fn<F>(
        &self,
        opts: Opts,
        const_labels: &[(&str, &str)],
        value: F,
    ) -> Result<Arc<GaugeFunc>>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let labels = LabelKey::from_pairs(const_labels.iter().copied());
        self.register_gauge(opts, labels, value)
    }

    /// Register `<namespace>_build_info`, a constant `1` labeled with
    /// version, revision, branch and runtime version.
    pub fn register_build_info(&self, namespace: &str, info: &BuildInfo) -> Result<Arc<GaugeFunc>> {
        let opts = Opts::new(
            "build_info",
            format!(
                "A metric with a constant '1' value labeled by version, revision, branch, and rustversion from which {namespace} was built."
            ),
        )
        .namespace(namespace);
        self.register_gauge(opts, info.label_key(), || 1.0)
    }

    fn register_gauge<F>(&self, opts: Opts, labels: LabelKey, value: F) -> Result<Arc<GaugeFunc>>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let name = opts.fq_name();
        validate_metric_name(&name)?;
        let names: Vec<String> = labels.pairs().iter().map(|(k, _)| k.clone()).collect();
        validate_label_names(&names)?;

        let gauge = Arc::new(GaugeFunc::new(labels, value));
        self.register(name, opts.help, gauge.clone())?;
        Ok(gauge)
    }

    /// Names of all registered families, in registration order.
    pub fn family_names(&self) -> Vec<String> {
        self.families.read().iter().map(|f| f.name.clone()).collect()
    }

    /// Snapshot every family.
    pub fn gather(&self) -> Vec<FamilySnapshot> {
        let families = self.families.read().clone();
        families
            .into_iter()
            .map(|f| FamilySnapshot {
                values: f.collector.collect(),
                name: f.name,
                help: f.help,
            })
            .collect()
    }

    /// Gather and render in the text exposition format.
    pub fn render(&self) -> String {
        exposition::render(&self.gather())
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}
