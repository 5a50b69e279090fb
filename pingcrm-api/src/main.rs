//! # PingCRM API Server
//!
//! Serves the JSON:API endpoints for accounts, users, organizations and
//! contacts.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/pingcrm cargo run -p pingcrm-api
//! STORE_BACKEND=memory cargo run -p pingcrm-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use pingcrm_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use pingcrm_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::{memory::MemoryStore, postgres::PgStore, RecordStore},
};
use sqlx::PgPool;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pingcrm_api=debug,pingcrm_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn RecordStore>, Option<PgPool>)> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Ok((Arc::new(MemoryStore::new()), None))
        }
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .context("DATABASE_URL environment variable is required")?;

            let pool = create_pool(DatabaseConfig {
                url,
                max_connections: config.database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to the database")?;

            if config.database.run_migrations {
                run_migrations(&pool)
                    .await
                    .context("Failed to apply migrations")?;
            }

            Ok((Arc::new(PgStore::new(pool.clone())), Some(pool)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("PingCRM API Server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let (store, pool) = open_store(&config).await?;

    let address = config.bind_address();
    tracing::info!(store = store.backend_name(), "Record store ready");

    let app = build_router(AppState::new(store, config));
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Server listening on http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
