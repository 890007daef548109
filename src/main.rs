use std::sync::Arc;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use orgscope_api::config::config;
use orgscope_api::database::{DatabaseManager, PgDirectory};
use orgscope_api::server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting orgscope API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    let directory = Arc::new(PgDirectory::new(pool.clone()));
    let state = AppState::new(directory, config).with_pool(pool);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("orgscope API listening on http://{}", bind_addr);
    axum::serve(listener, app(state, config)).await?;
    Ok(())
}
