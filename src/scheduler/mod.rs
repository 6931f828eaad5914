//! Scheduler module driving collection passes and the retention reaper.

mod collector;
mod retention;
mod trigger;

pub use collector::*;
pub use retention::*;
pub use trigger::*;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Owns the two periodic triggers.
///
/// Collection passes are single-flight: a tick that arrives while a pass is
/// still running is skipped.
pub struct Scheduler {
    collector: Arc<Collector>,
    reaper: Arc<RetentionReaper>,
    collection_interval: Duration,
    cleanup: Trigger,
    stop_tx: broadcast::Sender<()>,
    pass_guard: Arc<Semaphore>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Build a scheduler. An unparsable cleanup spec is a startup error.
    pub fn new(
        collector: Arc<Collector>,
        reaper: Arc<RetentionReaper>,
        collection_interval: Duration,
        cleanup_spec: &str,
    ) -> Result<Self, SchedulerError> {
        let cleanup = Trigger::parse(cleanup_spec)?;
        if collection_interval.is_zero() {
            return Err(SchedulerError::InvalidSpec {
                spec: format!("{:?}", collection_interval),
                reason: "collection interval must be positive".to_string(),
            });
        }
        let (stop_tx, _) = broadcast::channel(1);

        Ok(Self {
            collector,
            reaper,
            collection_interval,
            cleanup,
            stop_tx,
            pass_guard: Arc::new(Semaphore::new(1)),
            handles: Vec::new(),
        })
    }

    /// Spawn both trigger loops.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            return;
        }

        tracing::info!(
            "Starting scheduler: collection every {:?}, cleanup {:?}",
            self.collection_interval,
            self.cleanup
        );

        self.handles.push(tokio::spawn(run_collection_loop(
            self.collector.clone(),
            self.collection_interval,
            self.pass_guard.clone(),
            self.stop_tx.subscribe(),
        )));
        self.handles.push(tokio::spawn(run_retention_loop(
            self.reaper.clone(),
            self.cleanup.clone(),
            self.stop_tx.subscribe(),
        )));
    }

    /// Stop firing new ticks and wait for an in-flight pass to finish.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(());
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler task failed: {}", e);
            }
        }
        // The pass holds the only permit until it completes.
        let _ = self.pass_guard.acquire().await;
        tracing::info!("Scheduler stopped");
    }
}

async fn run_collection_loop(
    collector: Arc<Collector>,
    period: Duration,
    guard: Arc<Semaphore>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let permit = match guard.clone().try_acquire_owned() {
                    Ok(p) => p,
                    Err(_) => {
                        tracing::warn!("Skipping collection pass due to overlap limit");
                        continue;
                    }
                };

                let collector = collector.clone();
                tokio::spawn(async move {
                    let _permit = permit; // Hold permit until done
                    collector.run_pass().await;
                });
            }
        }
    }
}

async fn run_retention_loop(
    reaper: Arc<RetentionReaper>,
    trigger: Trigger,
    mut stop_rx: broadcast::Receiver<()>,
) {
    loop {
        let Some(delay) = trigger.delay_from(Utc::now()) else {
            tracing::warn!("Cleanup trigger has no upcoming run; retention disabled");
            break;
        };

        tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            _ = tokio::time::sleep(delay) => {
                // The bulk delete is a blocking SQLite call.
                let reaper = reaper.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || reaper.run()).await {
                    tracing::error!("Retention task failed: {}", e);
                }
            }
        }
    }
}
