//! Collaborator wiring for the running service

use crate::state::AppState;
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::PostgresVideoRepository;
use tubely_processing::FfmpegToolkit;

pub async fn initialize_services(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let storage = tubely_storage::create_storage(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    tokio::fs::create_dir_all(&config.ingest.staging_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create staging directory {}",
                config.ingest.staging_dir.display()
            )
        })?;

    let repository = Arc::new(PostgresVideoRepository::new(pool));
    let toolkit = Arc::new(FfmpegToolkit::from_config(&config.ingest));

    Ok(Arc::new(AppState::new(
        config.clone(),
        repository,
        storage,
        toolkit,
    )))
}
