use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::metrics::{CounterVec, HistogramVec, Opts, Registry, DEFAULT_BUCKETS};

/// Label set of the request counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestLabels {
    /// `{method, path}`
    #[default]
    MethodAndPath,
    /// `{path}`
    Path,
}

#[derive(Debug, Clone)]
pub struct HttpMetricsOpts {
    pub namespace: Option<String>,
    pub request_labels: RequestLabels,
    /// Latency boundaries in seconds.
    pub latency_buckets: Vec<f64>,
}

impl Default for HttpMetricsOpts {
    fn default() -> Self {
        Self {
            namespace: None,
            request_labels: RequestLabels::default(),
            latency_buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

/// The three families updated once per request.
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    requests: Arc<CounterVec>,
    statuses: Arc<CounterVec>,
    latency: Arc<HistogramVec>,
    request_labels: RequestLabels,
}

impl HttpMetrics {
    /// Register `http_requests_total`, `response_status` and
    /// `http_response_time_seconds`.
    pub fn register(registry: &Registry, opts: &HttpMetricsOpts) -> Result<Self> {
        let ns = opts.namespace.clone().unwrap_or_default();

        let request_labels: &[&str] = match opts.request_labels {
            RequestLabels::MethodAndPath => &["method", "path"],
            RequestLabels::Path => &["path"],
        };
        let requests = registry.counter_vec(
            Opts::new("http_requests_total", "Number of HTTP requests").namespace(ns.clone()),
            request_labels,
        )?;
        let statuses = registry.counter_vec(
            Opts::new("response_status", "Status of HTTP response").namespace(ns.clone()),
            &["status"],
        )?;
        let latency = registry.histogram_vec(
            Opts::new("http_response_time_seconds", "Duration of HTTP requests").namespace(ns),
            &["path"],
            &opts.latency_buckets,
        )?;

        Ok(Self {
            requests,
            statuses,
            latency,
            request_labels: opts.request_labels,
        })
    }

    /// Update all three families. Failures are logged and dropped.
    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let counted = match self.request_labels {
            RequestLabels::MethodAndPath => self.requests.inc(&[method, path]),
            RequestLabels::Path => self.requests.inc(&[path]),
        };
        if let Err(e) = counted {
            tracing::warn!(code = e.code().as_str(), error = %e, "request counter update dropped");
        }

        let status = status.to_string();
        if let Err(e) = self.statuses.inc(&[&status]) {
            tracing::warn!(code = e.code().as_str(), error = %e, "status counter update dropped");
        }

        if let Err(e) = self.latency.observe_duration(&[path], elapsed) {
            tracing::warn!(code = e.code().as_str(), error = %e, "latency observation dropped");
        }
    }

    pub fn requests(&self) -> &CounterVec {
        &self.requests
    }

    pub fn statuses(&self) -> &CounterVec {
        &self.statuses
    }

    pub fn latency(&self) -> &HistogramVec {
        &self.latency
    }

    pub fn request_labels(&self) -> RequestLabels {
        self.request_labels
    }
}
