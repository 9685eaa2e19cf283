//! Application setup and initialization
//!
//! Everything the server needs is built here from one [`Config`] value and passed
//! down explicitly.

pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use storefront_core::{Config, InMemoryProductAssets, MockCardNetwork};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config)?;

    let state = Arc::new(AppState::new(
        config.clone(),
        storage,
        Arc::new(InMemoryProductAssets::new()),
        Arc::new(MockCardNetwork),
    ));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
