use std::env;
use std::fmt;

use super::{Collect, SeriesValues};
use crate::labels::LabelKey;

/// A single computed value with labels fixed at registration.
pub struct GaugeFunc {
    labels: LabelKey,
    value: Box<dyn Fn() -> f64 + Send + Sync>,
}

impl GaugeFunc {
    pub(crate) fn new<F>(labels: LabelKey, value: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self {
            labels,
            value: Box::new(value),
        }
    }

    pub fn labels(&self) -> &LabelKey {
        &self.labels
    }

    /// Evaluate the value function.
    pub fn get(&self) -> f64 {
        (self.value)()
    }
}

impl fmt::Debug for GaugeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeFunc")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Collect for GaugeFunc {
    fn collect(&self) -> SeriesValues {
        SeriesValues::Gauge(vec![(self.labels.clone(), self.get())])
    }
}

/// Deployment metadata baked into the `<namespace>_build_info` gauge.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub branch: String,
    pub rust_version: String,
}

impl BuildInfo {
    /// Read `VERSION`, `REVISION`, `BRANCH` and `RUST_VERSION` from the
    /// process environment. Missing variables become empty strings, except
    /// the runtime which falls back to `unknown`.
    pub fn from_env() -> Self {
        let var = |k: &str| env::var(k).unwrap_or_default();
        let rust_version = env::var("RUST_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            version: var("VERSION"),
            revision: var("REVISION"),
            branch: var("BRANCH"),
            rust_version,
        }
    }

    pub(crate) fn label_key(&self) -> LabelKey {
        LabelKey::from_pairs([
            ("branch", self.branch.as_str()),
            ("revision", self.revision.as_str()),
            ("rustversion", self.rust_version.as_str()),
            ("version", self.version.as_str()),
        ])
    }
}
