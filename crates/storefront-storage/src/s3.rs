use crate::keys::validate_key;
use crate::traits::{CompletedPart, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::multipart::{MultipartStore, PartId};
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use secrecy::ExposeSecret;
use storefront_core::StorageConfig;

/// Region assumed for S3-compatible endpoints that do not care about regions.
const DEFAULT_COMPATIBLE_REGION: &str = "us-east-1";

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage from the storage configuration
    ///
    /// Credentials from the configuration take precedence; without them the
    /// builder falls back to the ambient AWS environment (instance profile,
    /// web identity). A custom endpoint (e.g. "http://localhost:9000" for MinIO)
    /// makes the region optional.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
        let endpoint_url = config.endpoint.clone();
        let region = match (&config.region, &endpoint_url) {
            (Some(region), _) => region.clone(),
            (None, Some(_)) => DEFAULT_COMPATIBLE_REGION.to_string(),
            (None, None) => {
                return Err(StorageError::ConfigError(
                    "S3_REGION or AWS_REGION not configured".to_string(),
                ))
            }
        };

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            builder = builder
                .with_access_key_id(access_key_id.clone())
                .with_secret_access_key(secret_access_key.expose_secret());
        }

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    fn location(key: &str) -> StorageResult<Path> {
        validate_key(key)?;
        Ok(Path::from(key.to_string()))
    }
}

/// Stores the part's content type as the object's `Content-Type` header.
fn put_options(content_type: &str) -> PutOptions {
    PutOptions {
        attributes: Attributes::from_iter([(Attribute::ContentType, content_type.to_string())]),
        ..Default::default()
    }
}

/// For AWS S3 the virtual-hosted URL, for S3-compatible providers the path-style
/// URL under the custom endpoint.
fn public_url(bucket: &str, region: &str, endpoint_url: Option<&str>, key: &str) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> String {
        public_url(&self.bucket, &self.region, self.endpoint_url.as_deref(), key)
    }

    async fn create_multipart_upload(&self, key: &str) -> StorageResult<String> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.create_multipart(&location).await;

        let upload_id = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 create multipart upload failed"
            );
            StorageError::StoreUnavailable(e.to_string())
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            upload_id = %upload_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload created"
        );

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<String> {
        let location = Self::location(key)?;
        let part_idx = part_number.checked_sub(1).ok_or(StorageError::PartOutOfOrder {
            expected: 1,
            got: part_number,
        })? as usize;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<PartId> = self
            .store
            .put_part(
                &location,
                &upload_id.to_string(),
                part_idx,
                PutPayload::from(data),
            )
            .await;

        let part = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                upload_id = %upload_id,
                part_number,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload part failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            part_number,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 part uploaded"
        );

        Ok(part.content_id)
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();
        let part_ids = parts
            .iter()
            .map(|part| PartId {
                content_id: part.e_tag.clone(),
            })
            .collect();

        let result: ObjectResult<_> = self
            .store
            .complete_multipart(&location, &upload_id.to_string(), part_ids)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                upload_id = %upload_id,
                parts = parts.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 complete multipart upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            parts = parts.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 multipart upload completed"
        );

        Ok(())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .abort_multipart(&location, &upload_id.to_string())
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                upload_id = %upload_id,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 abort multipart upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            upload_id = %upload_id,
            "S3 multipart upload aborted"
        );

        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let location = Self::location(key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();
        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), put_options(content_type))
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.object_url(key))
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::DeleteFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Config;

    fn s3_config() -> StorageConfig {
        let mut config = Config::default().storage;
        config.backend = StorageBackend::S3;
        config.bucket = Some("shop-assets".to_string());
        config.region = Some("eu-west-1".to_string());
        config
    }

    #[test]
    fn test_put_options_carry_content_type() {
        let opts = put_options("image/png");
        assert_eq!(
            opts.attributes
                .get(&Attribute::ContentType)
                .map(AsRef::<str>::as_ref),
            Some("image/png")
        );
    }

    #[test]
    fn test_public_url_aws() {
        assert_eq!(
            public_url("shop-assets", "eu-west-1", None, "gallery/a.png"),
            "https://shop-assets.s3.eu-west-1.amazonaws.com/gallery/a.png"
        );
    }

    #[test]
    fn test_public_url_custom_endpoint() {
        assert_eq!(
            public_url("shop-assets", "us-east-1", Some("http://localhost:9000/"), "t.zip"),
            "http://localhost:9000/shop-assets/t.zip"
        );
    }

    #[test]
    fn test_new_requires_bucket() {
        let mut config = s3_config();
        config.bucket = None;
        assert!(matches!(
            S3Storage::new(&config),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_new_requires_region_without_endpoint() {
        let mut config = s3_config();
        config.region = None;
        assert!(matches!(
            S3Storage::new(&config),
            Err(StorageError::ConfigError(_))
        ));

        config.endpoint = Some("http://localhost:9000".to_string());
        let storage = S3Storage::new(&config).unwrap();
        assert_eq!(storage.bucket(), "shop-assets");
        assert_eq!(
            storage.object_url("a.zip"),
            "http://localhost:9000/shop-assets/a.zip"
        );
    }
}
