//! # NudgePay Worker
//!
//! Background process that sends invoice reminders. It opens (and if needed
//! creates) the SQLite database, applies migrations, and sweeps every
//! organization for due reminders on a fixed interval until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=sqlite://nudgepay.db cargo run -p nudgepay-worker
//! ```

use nudgepay_shared::clock::SystemClock;
use nudgepay_shared::db::migrations::{ensure_database_exists, run_migrations};
use nudgepay_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use nudgepay_worker::config::Config;
use nudgepay_worker::scheduler::SweepScheduler;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nudgepay_worker=debug,nudgepay_shared=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("NudgePay Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    ensure_database_exists(&config.database.url).await?;
    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    if !config.sweep.enabled {
        tracing::warn!("WORKER_ENABLED is false, reminder sweep not started");
        tokio::signal::ctrl_c().await?;
        close_pool(pool).await;
        return Ok(());
    }

    let scheduler = Arc::new(SweepScheduler::new(
        pool.clone(),
        Arc::new(SystemClock),
        config.sweep.scheduler_config(),
    ));
    let shutdown = scheduler.shutdown_token();

    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run().await }
    });

    tracing::info!("Worker ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, finishing in-flight reminders...");

    shutdown.cancel();
    handle.await?;

    close_pool(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}
