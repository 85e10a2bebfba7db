use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use notes_api::config::AppConfig;
use notes_api::database::{DatabaseManager, MemoryDatabase, PgDatabase, Repositories};
use notes_api::storage::{BlobStorage, LocalDiskStorage};
use notes_api::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting Notes API in {:?} mode", config.environment);

    let repos = match config.database.url {
        Some(_) => {
            let pool = DatabaseManager::connect(&config.database).await?;
            Repositories::from_backend(Arc::new(PgDatabase::new(pool)))
        }
        None if config.is_development() => {
            tracing::warn!("DATABASE_URL is not set; using the in-memory store, data will not survive a restart");
            Repositories::from_backend(Arc::new(MemoryDatabase::new()))
        }
        None => bail!("DATABASE_URL must be set outside development"),
    };

    let storage = LocalDiskStorage::new(&config.storage.upload_dir)
        .await
        .with_context(|| format!("failed to prepare upload directory {}", config.storage.upload_dir.display()))?;
    tracing::info!("Storing attachments under {}", storage.root().display());
    let storage: Arc<dyn BlobStorage> = Arc::new(storage);

    let port = config.api.port;
    let state = AppState::build(config, repos, storage)?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Notes API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
