//! Storage setup and initialization

use anyhow::{Context, Result};
use std::sync::Arc;
use storefront_core::Config;
use storefront_storage::{create_storage, Storage};

pub fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage abstraction...");
    let storage = create_storage(config).context("Failed to initialize object storage")?;
    tracing::info!(
        backend = ?storage.backend_type(),
        bucket = %storage.bucket(),
        part_size_bytes = config.storage.part_size_bytes,
        part_timeout_secs = config.storage.part_timeout_secs,
        "Storage abstraction initialized successfully"
    );
    Ok(storage)
}
