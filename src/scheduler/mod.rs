//! Periodic consolidation scheduler
//!
//! Runs a consolidation round over every configured framework on a fixed
//! interval. A failed run is logged and never stops the loop; frameworks
//! within a round run concurrently.

use crate::config::ScheduleConfig;
use crate::consolidation::{ConsolidationEngine, ConsolidationResult};
use crate::error::{Error, Result};
use crate::memory::Framework;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Background loop driving [`ConsolidationEngine`] on a schedule.
pub struct ConsolidationScheduler {
    engine: Arc<ConsolidationEngine>,
    config: ScheduleConfig,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConsolidationScheduler {
    pub fn new(engine: Arc<ConsolidationEngine>, config: ScheduleConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine,
            config,
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Run one consolidation per configured framework and wait for all of
    /// them. Outcomes follow the configured framework order.
    pub async fn run_round(&self) -> Vec<(Framework, Result<ConsolidationResult>)> {
        run_round(&self.engine, &self.config).await
    }

    /// Spawn the interval loop. The first round starts immediately.
    pub async fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(Error::AlreadyRunning("scheduler".to_string()));
        }
        self.shutdown.send_replace(false);

        let engine = self.engine.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_round(&engine, &config).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Consolidation scheduler stopped");
        }));

        tracing::info!(
            interval_secs = self.config.interval_secs,
            window_hours = self.config.window_hours,
            frameworks = self.config.frameworks.len(),
            "Consolidation scheduler started"
        );
        Ok(())
    }

    /// Signal the loop to stop and wait for the in-progress round, if any.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Consolidation scheduler task panicked");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

async fn run_round(
    engine: &ConsolidationEngine,
    config: &ScheduleConfig,
) -> Vec<(Framework, Result<ConsolidationResult>)> {
    let window = config.window();
    let runs = config
        .frameworks
        .iter()
        .map(|&framework| async move { (framework, engine.consolidate(framework, window).await) });
    let outcomes = futures::future::join_all(runs).await;

    for (framework, outcome) in &outcomes {
        match outcome {
            Ok(result) => tracing::info!(
                %framework,
                consolidation_id = %result.consolidation_id,
                score = result.consolidation_score,
                "Scheduled consolidation finished"
            ),
            Err(e) => tracing::error!(
                %framework,
                error = %e,
                "Scheduled consolidation failed"
            ),
        }
    }
    outcomes
}
