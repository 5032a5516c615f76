//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use epubfix_core::Config;
use epubfix_db::{UploadRepository, UserRepository};
use epubfix_processing::{ConventionLocator, EpubFixCli};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;

    let tool = EpubFixCli::new(config.fixer().clone()).context("Invalid epub-fix configuration")?;
    let locator = ConventionLocator::from_config(config.fixer());

    let state = Arc::new(
        AppState::new(
            config.clone(),
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(UploadRepository::new(pool)),
            Arc::new(tool),
            Arc::new(locator),
        )
        .await?,
    );

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
