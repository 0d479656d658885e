//! Shared application state.
//!
//! Owns the registry, the request-path instrumentation (metrics + tracer)
//! and the instrumented demo handlers. Startup errors are returned, never
//! panicked on.

use std::sync::Arc;
use std::time::Duration;

use reqscope_core::error::Result;
use reqscope_core::instrument::{HttpMetrics, HttpMetricsOpts, InstrumentedHandler};
use reqscope_core::metrics::{BuildInfo, CounterVec, Registry};
use reqscope_core::trace::{AlwaysSample, RatioSampler, Sampler, SpanExporter, Tracer};

use crate::config::ScopeConfig;
use crate::handlers::{Greet, Index, NotFound, Work};
use crate::synthetic::{self, SyntheticLoad};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ScopeConfig,
    registry: Arc<Registry>,
    tracer: Tracer,
    heartbeat: Arc<CounterVec>,
    synthetic: Option<SyntheticLoad>,
    index: InstrumentedHandler<Index>,
    greet: InstrumentedHandler<Greet>,
    work: InstrumentedHandler<Work>,
    not_found: InstrumentedHandler<NotFound>,
}

impl AppState {
    /// Build application state. Ended spans go to `exporter`.
    pub fn new(cfg: ScopeConfig, exporter: Arc<dyn SpanExporter>) -> Result<Self> {
        Self::with_work(cfg, exporter, Work::default())
    }

    /// Like `new`, with a custom `/work` handler (shorter steps in tests).
    pub fn with_work(
        cfg: ScopeConfig,
        exporter: Arc<dyn SpanExporter>,
        work: Work,
    ) -> Result<Self> {
        cfg.validate()?;
        let registry = Arc::new(Registry::new());
        let ns = cfg.metrics.namespace.as_str();

        let metrics = HttpMetrics::register(
            &registry,
            &HttpMetricsOpts {
                namespace: None,
                request_labels: cfg.metrics.request_labels()?,
                latency_buckets: cfg.metrics.latency_buckets.clone(),
            },
        )?;
        registry.register_build_info(ns, &BuildInfo::from_env())?;
        let heartbeat = synthetic::register_heartbeat(&registry, ns)?;
        let synthetic = if cfg.metrics.synthetic_load.enabled {
            Some(SyntheticLoad::register(&registry, ns)?)
        } else {
            None
        };

        let tracer = if cfg.tracing.enabled {
            let sampler: Arc<dyn Sampler> = if cfg.tracing.sample_ratio >= 1.0 {
                Arc::new(AlwaysSample)
            } else {
                Arc::new(RatioSampler::new(cfg.tracing.sample_ratio))
            };
            Tracer::new(sampler, exporter)
        } else {
            Tracer::disabled()
        };

        let index = InstrumentedHandler::new(Index, metrics.clone(), tracer.clone());
        let greet = InstrumentedHandler::new(Greet, metrics.clone(), tracer.clone());
        let not_found = InstrumentedHandler::new(NotFound, metrics.clone(), tracer.clone());
        let work = InstrumentedHandler::new(work, metrics, tracer.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                tracer,
                heartbeat,
                synthetic,
                index,
                greet,
                work,
                not_found,
            }),
        })
    }

    pub fn cfg(&self) -> &ScopeConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn tracer(&self) -> &Tracer {
        &self.inner.tracer
    }

    pub fn heartbeat(&self) -> Arc<CounterVec> {
        Arc::clone(&self.inner.heartbeat)
    }

    pub fn synthetic(&self) -> Option<SyntheticLoad> {
        self.inner.synthetic.clone()
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.inner.cfg.metrics.heartbeat_interval_ms)
    }

    pub fn synthetic_period(&self) -> Duration {
        Duration::from_millis(self.inner.cfg.metrics.synthetic_load.interval_ms)
    }

    pub fn index(&self) -> &InstrumentedHandler<Index> {
        &self.inner.index
    }

    pub fn greet(&self) -> &InstrumentedHandler<Greet> {
        &self.inner.greet
    }

    pub fn work(&self) -> &InstrumentedHandler<Work> {
        &self.inner.work
    }

    pub fn not_found(&self) -> &InstrumentedHandler<NotFound> {
        &self.inner.not_found
    }
}
