use serde::Deserialize;

use reqscope_core::error::{Result, ScopeError};
use reqscope_core::instrument::RequestLabels;
use reqscope_core::labels::validate_metric_name;
use reqscope_core::metrics::histogram::validate_buckets;
use reqscope_core::metrics::DEFAULT_BUCKETS;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub tracing: TracingSection,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
            tracing: TracingSection::default(),
        }
    }
}

impl ScopeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ScopeError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.server.validate()?;
        self.metrics.validate()?;
        self.tracing.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen
            .parse::<std::net::SocketAddr>()
            .map_err(|e| ScopeError::Config(format!("server.listen {:?}: {e}", self.listen)))?;
        Ok(())
    }
}

/// Label names accepted in `metrics.request_labels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestLabel {
    Method,
    Path,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_request_labels")]
    pub request_labels: Vec<RequestLabel>,

    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,

    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    #[serde(default)]
    pub synthetic_load: SyntheticLoadSection,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            request_labels: default_request_labels(),
            latency_buckets: default_latency_buckets(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            synthetic_load: SyntheticLoadSection::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        validate_metric_name(&self.namespace)
            .map_err(|e| ScopeError::Config(format!("metrics.namespace: {e}")))?;
        self.request_labels()?;
        validate_buckets(&self.latency_buckets)
            .map_err(|e| ScopeError::Config(format!("metrics.latency_buckets: {e}")))?;
        if !(100..=60_000).contains(&self.heartbeat_interval_ms) {
            return Err(ScopeError::Config(
                "metrics.heartbeat_interval_ms must be between 100 and 60000".into(),
            ));
        }
        self.synthetic_load.validate()
    }

    /// Label set of `http_requests_total`. Only `[method, path]` and `[path]`
    /// are supported.
    pub fn request_labels(&self) -> Result<RequestLabels> {
        match self.request_labels.as_slice() {
            [RequestLabel::Method, RequestLabel::Path] => Ok(RequestLabels::MethodAndPath),
            [RequestLabel::Path] => Ok(RequestLabels::Path),
            other => Err(ScopeError::Config(format!(
                "metrics.request_labels must be [method, path] or [path], got {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyntheticLoadSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_synthetic_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SyntheticLoadSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_synthetic_interval_ms(),
        }
    }
}

impl SyntheticLoadSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=60_000).contains(&self.interval_ms) {
            return Err(ScopeError::Config(
                "metrics.synthetic_load.interval_ms must be between 10 and 60000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_sample_ratio")]
    pub sample_ratio: f64,

    #[serde(default = "default_export_queue")]
    pub export_queue: usize,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TracingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_ratio: default_sample_ratio(),
            export_queue: default_export_queue(),
            service_name: default_service_name(),
        }
    }
}

impl TracingSection {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.sample_ratio) {
            return Err(ScopeError::Config(
                "tracing.sample_ratio must be between 0.0 and 1.0".into(),
            ));
        }
        if !(1..=1_048_576).contains(&self.export_queue) {
            return Err(ScopeError::Config(
                "tracing.export_queue must be between 1 and 1048576".into(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(ScopeError::Config(
                "tracing.service_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:2112".into()
}
fn default_namespace() -> String {
    "myapp".into()
}
fn default_request_labels() -> Vec<RequestLabel> {
    vec![RequestLabel::Method, RequestLabel::Path]
}
fn default_latency_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
fn default_heartbeat_interval_ms() -> u64 {
    1000
}
fn default_synthetic_interval_ms() -> u64 {
    200
}
fn default_true() -> bool {
    true
}
fn default_sample_ratio() -> f64 {
    1.0
}
fn default_export_queue() -> usize {
    1024
}
fn default_service_name() -> String {
    "reqscope".into()
}
