//! Periodic background collectors.
//!
//! Each collector is one tokio task driving a synchronous tick closure on a
//! fixed period. The first tick fires one period after spawn. Stop is
//! cooperative: the loop polls the stop signal before the timer (`biased`),
//! so once `stop` is signalled at most the tick already in flight completes.

use std::time::Duration;

use reqscope_core::error::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Spawns collector loops. See [`CollectorHandle`] for shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundCollector;

impl BackgroundCollector {
    /// Run `task` every `period` until the returned handle is stopped or
    /// dropped. Errors from `task` are logged and the loop keeps going.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn<F>(name: impl Into<String>, period: Duration, mut task: F) -> CollectorHandle
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let loop_name = name.clone();

        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(collector = %loop_name, period_ms = period.as_millis() as u64, "collector started");

            let mut ticks: u64 = 0;
            loop {
                tokio::select! {
                    biased;
                    // Err means every sender is gone; treat it as stop.
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        ticks += 1;
                        if let Err(e) = task() {
                            tracing::warn!(
                                collector = %loop_name,
                                code = e.code().as_str(),
                                error = %e,
                                "collector tick failed"
                            );
                        }
                    }
                }
            }
            tracing::info!(collector = %loop_name, ticks, "collector stopped");
        });

        CollectorHandle {
            name,
            stop_tx,
            join: Some(join),
        }
    }
}

/// Owner of a running collector loop. Dropping it signals stop without
/// waiting; `stop` signals and waits.
#[derive(Debug)]
pub struct CollectorHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Signal stop and wait for the loop to exit. A panic inside the tick
    /// closure surfaces here and is logged.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        let Some(join) = self.join.take() else {
            return;
        };
        if let Err(e) = join.await {
            if e.is_panic() {
                tracing::error!(collector = %self.name, "collector task panicked");
            } else {
                tracing::warn!(collector = %self.name, error = %e, "collector task cancelled");
            }
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
