use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use venue_admin_api::config;
use venue_admin_api::database::DatabaseManager;
use venue_admin_api::services::{ChromeRenderer, LocalMediaStore};
use venue_admin_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let config = config::config();
    tracing::info!("Starting Venue Admin API in {:?} mode", config.environment);

    config.validate()?;

    // Lazy pool: the server comes up without a database and /health reports 503
    let pool = DatabaseManager::connect_lazy()?;
    if config.database.auto_migrate {
        if let Err(e) = DatabaseManager::migrate(&pool).await {
            tracing::error!("Automatic migration failed: {}", e);
        }
    }

    let state = AppState::new(
        pool,
        Arc::new(LocalMediaStore::new(&config.storage.media_root, config.storage.max_upload_bytes)),
        Arc::new(ChromeRenderer::new(&config.storage.report_dir, &config.storage.browser_bin)),
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Venue Admin API listening on http://{}", bind_addr);

    axum::serve(listener, venue_admin_api::app(state)).await?;
    Ok(())
}
