//! # TaskMate Worker
//!
//! Sweeps one owner's done board on a fixed interval, deleting tasks that
//! were completed more than 48 hours ago.
//!
//! ## Usage
//!
//! ```bash
//! CLEANUP_OWNER_ID=<uuid> cargo run -p taskmate-worker
//! ```

use std::sync::Arc;

use anyhow::Context;
use taskmate_shared::{
    db::{pool::create_lazy_pool, DatabaseConfig},
    telemetry::{init_tracing, LogFormat},
};
use taskmate_worker::{
    config::WorkerConfig,
    scheduler::{CleanupScheduler, PgCleanupJob},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;

    init_tracing("taskmate_worker=debug", LogFormat::from_env());

    tracing::info!("TaskMate Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    // A sweep against an unreachable database fails and is retried on the
    // next tick, so the worker does not wait for PostgreSQL at startup.
    let db = create_lazy_pool(
        &DatabaseConfig::new(config.database_url.clone()).with_max_connections(config.max_connections),
    )
    .context("invalid DATABASE_URL")?;

    let scheduler = CleanupScheduler::new(
        Arc::new(PgCleanupJob::new(db.clone())),
        config.owner_id,
        config.interval,
    )
    .with_run_on_start(config.run_on_start);

    let token = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received, exiting...");
        token.cancel();
    });

    scheduler.run().await;

    db.close().await;
    tracing::info!("Worker stopped");

    Ok(())
}
