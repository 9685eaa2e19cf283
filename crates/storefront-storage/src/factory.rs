#[cfg(feature = "storage-memory")]
use crate::MemoryStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageBackend, StorageResult};
#[cfg(not(all(feature = "storage-s3", feature = "storage-memory")))]
use crate::StorageError;
use std::sync::Arc;
use storefront_core::Config;

/// Create a storage backend based on configuration
pub fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            if !config.storage.has_credentials() {
                tracing::warn!(
                    "AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY not set, relying on ambient AWS credentials"
                );
            }
            let storage = S3Storage::new(&config.storage)?;
            tracing::info!(
                bucket = %storage.bucket(),
                endpoint = ?config.s3_endpoint(),
                "Using S3 storage backend"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            let bucket = config.s3_bucket().unwrap_or("storefront-dev");
            let base_url = format!("http://localhost:{}/objects", config.server_port());
            tracing::warn!(bucket = %bucket, "Using in-memory storage backend, objects are not persisted");
            Ok(Arc::new(MemoryStorage::new(bucket, base_url)))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "storage-memory")]
    #[test]
    fn test_default_config_uses_memory_backend() {
        let storage = create_storage(&Config::default()).unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
        assert_eq!(storage.bucket(), "storefront-dev");
    }

    #[cfg(feature = "storage-s3")]
    #[test]
    fn test_s3_backend_without_region_is_config_error() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::S3;
        config.storage.region = None;
        config.storage.endpoint = None;
        assert!(matches!(
            create_storage(&config),
            Err(crate::StorageError::ConfigError(_))
        ));
    }
}
