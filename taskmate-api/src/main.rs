//! # TaskMate API Server
//!
//! Serves the kanban API: session authentication, tasks, boards, tags and
//! the cleanup endpoints.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskmate cargo run -p taskmate-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use taskmate_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskmate_shared::{
    auth::session::{MemorySessionStore, RedisSessionStore, SessionManager, SessionStore},
    db::{create_pool, migrations::run_migrations, DatabaseConfig},
    redis::{RedisClient, RedisConfig},
    telemetry::{init_tracing, LogFormat},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    init_tracing("taskmate_api=debug,tower_http=debug", LogFormat::from_env());

    tracing::info!("TaskMate API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let db = create_pool(
        DatabaseConfig::new(config.database.url.clone()).with_max_connections(config.database.max_connections),
    )
    .await
    .context("failed to connect to PostgreSQL")?;

    run_migrations(&db).await.context("failed to run migrations")?;

    let store: Arc<dyn SessionStore> = match RedisConfig::from_env() {
        Some(redis_config) => {
            let client = RedisClient::new(redis_config)
                .await
                .context("failed to connect to Redis")?;
            if !client.ping().await.context("Redis did not answer PING")? {
                anyhow::bail!("Redis answered PING with an unexpected reply");
            }
            Arc::new(RedisSessionStore::new(client))
        }
        None => {
            tracing::warn!("REDIS_URL not set; sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new())
        }
    };
    let sessions = SessionManager::with_ttl(store, config.session.ttl());

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(db.clone(), sessions, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
