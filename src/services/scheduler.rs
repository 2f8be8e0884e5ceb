//! Timer loops driving the fetch-validate cycle and the reaper
//!
//! Both loops run once immediately at startup and then on their own fixed
//! period until the shutdown signal flips. A failing run is logged and the
//! loop waits for its next tick. Validation tasks dispatched by a cycle are
//! detached and are not waited on at shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::services::{FetchCycle, Reaper};

/// Scheduler configuration
#[derive(Clone)]
pub struct SchedulerConfig {
    /// Period of the fetch-validate cycle
    pub fetch_interval: Duration,
    /// Period of the dead-proxy sweep
    pub reap_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(5),
            reap_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Owns the two periodic jobs
pub struct Scheduler {
    fetch_cycle: Arc<FetchCycle>,
    reaper: Arc<Reaper>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(fetch_cycle: FetchCycle, reaper: Reaper, config: SchedulerConfig) -> Self {
        Self {
            fetch_cycle: Arc::new(fetch_cycle),
            reaper: Arc::new(reaper),
            config,
        }
    }

    /// Spawn both loops and return the handle that stops them
    pub fn start(self) -> SchedulerHandle {
        info!(
            "Starting scheduler (fetch every {}s, sweep every {}s, max_err: {})",
            self.config.fetch_interval.as_secs(),
            self.config.reap_interval.as_secs(),
            self.reaper.max_err()
        );

        let (mut handle, shutdown) = SchedulerHandle::new();

        let fetch_task = tokio::spawn(run_fetch_loop(
            self.fetch_cycle.clone(),
            self.config.fetch_interval,
            shutdown.clone(),
        ));
        let reap_task = tokio::spawn(run_reap_loop(
            self.reaper.clone(),
            self.config.reap_interval,
            shutdown,
        ));

        handle.tasks = vec![fetch_task, reap_task];
        handle
    }
}

/// Repeatedly fetch and dispatch a batch until shutdown
#[instrument(skip(cycle, shutdown))]
pub async fn run_fetch_loop(
    cycle: Arc<FetchCycle>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match cycle.run_once().await {
                    // Handles are dropped; the tasks finish on their own
                    Ok(_handles) => {}
                    Err(e) => error!("Failed to fetch proxies: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Fetch loop shutting down");
                    break;
                }
            }
        }
    }
}

/// Repeatedly sweep dead proxies until shutdown
#[instrument(skip(reaper, shutdown))]
pub async fn run_reap_loop(
    reaper: Arc<Reaper>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("start delete proxy");
                if let Err(e) = reaper.sweep().await {
                    error!("Failed to delete dead proxies: {}", e);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Reap loop shutting down");
                    break;
                }
            }
        }
    }
}

/// Handle for stopping the scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                shutdown_tx: tx,
                tasks: Vec::new(),
            },
            rx,
        )
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for both loops to exit
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Scheduler loop ended abnormally: {}", e);
            }
        }
    }
}
