//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::{Context, Result};
use storefront_core::{Config, StorageBackend};

/// Validate critical configuration values
///
/// Fails on settings that would break uploads or expose the API, and warns on
/// ones that only make sense during development.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;

    if config.is_production() && config.storage_backend() == StorageBackend::Memory {
        tracing::warn!(
            "In-memory storage backend in production - uploaded files are lost on restart"
        );
    }

    if config.max_template_size_bytes() < config.max_image_size_bytes() {
        tracing::warn!(
            max_template_size_bytes = config.max_template_size_bytes(),
            max_image_size_bytes = config.max_image_size_bytes(),
            "Template size limit is below the gallery image limit"
        );
    }

    Ok(())
}
