//! Pxier Maintainer - Entry Point
//!
//! Starts the fetch-validate and reaper loops with graceful shutdown support.

use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pxier_maintainer::config::{Config, LogConfig};
use pxier_maintainer::database::Database;
use pxier_maintainer::error::Result;
use pxier_maintainer::inventory::{PxierClient, DEFAULT_REQUEST_TIMEOUT};
use pxier_maintainer::proxy::{ProxyProber, DEFAULT_PROBE_TIMEOUT};
use pxier_maintainer::repository::ProxyRepository;
use pxier_maintainer::services::{
    FetchCycle, FetchCycleConfig, Reaper, ReportLimiter, Scheduler, SchedulerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(&LogConfig::from_env());

    info!("Starting Pxier Maintainer");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        max_concurrency = config.maintainer.max_concurrency,
        each_fetch_num = config.maintainer.each_fetch_num,
        max_err = config.maintainer.max_err,
        "Configuration loaded"
    );

    // Connect to database
    let db = Database::new(&config.database).await?;
    info!("Connected to database");

    // Run migrations
    db.run_migrations().await?;
    info!("Database migrations complete");

    let inventory = Arc::new(PxierClient::new(
        &config.maintainer.pxier_base_url,
        config.maintainer.max_concurrency,
        DEFAULT_REQUEST_TIMEOUT,
    )?);
    let prober = Arc::new(ProxyProber::new(
        &config.maintainer.check_connection_url,
        DEFAULT_PROBE_TIMEOUT,
    )?);

    let fetch_cycle = FetchCycle::new(
        inventory,
        prober,
        ReportLimiter::new(config.maintainer.max_concurrency),
        FetchCycleConfig {
            each_fetch_num: config.maintainer.each_fetch_num,
        },
    );
    let reaper = Reaper::new(
        Arc::new(ProxyRepository::new(db.pool().clone())),
        config.maintainer.max_err,
    );

    let handle = Scheduler::new(fetch_cycle, reaper, SchedulerConfig::default()).start();

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received");

    handle.shutdown();
    handle.join().await;

    db.close().await;

    info!("Pxier Maintainer stopped");
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pxier_maintainer={}", log.level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
