//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(&config.base.log_format, &config.base.environment)
        .context("Failed to initialize telemetry")?;

    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let state = services::initialize_services(&config, pool).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
