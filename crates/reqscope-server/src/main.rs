//! reqscope server
//!
//! - `/`, `/greet`, `/work` : instrumented demo handlers
//! - `/metrics`             : Prometheus text exposition
//! - `/healthz`             : liveness
//!
//! Config path: first CLI argument, else `reqscope.yaml` (missing → defaults).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use reqscope_core::error::{Result, ScopeError};
use reqscope_core::trace::{NoopExporter, SpanExporter};
use tracing_subscriber::{fmt, EnvFilter};

use reqscope_server::{
    app_state::AppState,
    collector::{BackgroundCollector, CollectorHandle},
    config,
    export::{self, ExportWorker, LogSink},
    router,
};

const DEFAULT_CONFIG_PATH: &str = "reqscope.yaml";
const EXPORT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "reqscope-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_or_default(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| ScopeError::Config(format!("server.listen: {e}")))?;

    let (exporter, worker): (Arc<dyn SpanExporter>, Option<ExportWorker>) = if cfg.tracing.enabled {
        let (queue, worker) = export::spawn_queue(
            cfg.tracing.export_queue,
            LogSink::new(cfg.tracing.service_name.clone()),
        );
        (queue as Arc<dyn SpanExporter>, Some(worker))
    } else {
        (Arc::new(NoopExporter), None)
    };

    let state = AppState::new(cfg, exporter)?;
    tracing::info!(
        families = ?state.registry().family_names(),
        sampler = ?state.tracer().sampler(),
        "instrumentation ready"
    );

    let mut collectors: Vec<CollectorHandle> = Vec::new();
    let heartbeat = state.heartbeat();
    collectors.push(BackgroundCollector::spawn(
        "heartbeat",
        state.heartbeat_period(),
        move || heartbeat.inc(&[]),
    ));
    if let Some(load) = state.synthetic() {
        collectors.push(BackgroundCollector::spawn(
            "synthetic_load",
            state.synthetic_period(),
            move || load.tick(),
        ));
    }

    let app = router::build_router(state);

    tracing::info!(%listen, "reqscope-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ScopeError::Internal(format!("bind {listen} failed: {e}")))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScopeError::Internal(format!("server failed: {e}")));

    for c in collectors {
        c.stop().await;
    }
    // The router (and with it every exporter handle) is gone once serve
    // returns, so the worker drains and exits.
    if let Some(worker) = worker {
        match tokio::time::timeout(EXPORT_DRAIN_TIMEOUT, worker.join()).await {
            Ok(exported) => tracing::info!(exported, "span export drained"),
            Err(_) => tracing::warn!("span export drain timed out"),
        }
    }
    tracing::info!("reqscope-server stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
