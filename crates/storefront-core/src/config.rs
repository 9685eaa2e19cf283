//! Configuration module
//!
//! Configuration is read once from the environment (optionally seeded from a `.env`
//! file) and then handed explicitly to every component that needs it. Nothing in
//! the workspace reads settings from a process-wide global.

use std::env;
use std::time::Duration;

use secrecy::SecretString;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 8000;
const MIB: usize = 1024 * 1024;
/// S3 rejects non-final multipart parts smaller than this.
pub const MIN_PART_SIZE_BYTES: usize = 5 * MIB;
const PART_SIZE_MB: usize = 5;
const PART_TIMEOUT_SECS: u64 = 60;
const MAX_TEMPLATE_SIZE_MB: usize = 500;
const MAX_IMAGE_SIZE_MB: usize = 10;
const IMAGE_FOLDER: &str = "gallery";

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// `compact` (default) or `json`
    pub log_format: String,
}

/// Object storage settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    /// Key prefix for product gallery images
    pub image_folder: String,
    pub part_size_bytes: usize,
    pub part_timeout_secs: u64,
}

impl StorageConfig {
    pub fn part_timeout(&self) -> Duration {
        Duration::from_secs(self.part_timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

/// Request body limits for the upload endpoints
#[derive(Clone, Debug)]
pub struct UploadLimits {
    pub max_template_size_bytes: usize,
    pub max_image_size_bytes: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub limits: UploadLimits,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
        };

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            bucket: env::var("S3_BUCKET")
                .or_else(|_| env::var("AWS_S3_BUCKET_NAME"))
                .ok(),
            region: env::var("S3_REGION").or_else(|_| env::var("AWS_REGION")).ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY")
                .ok()
                .map(SecretString::from),
            image_folder: env::var("S3_IMAGE_FOLDER")
                .map(|s| s.trim_matches('/').to_string())
                .unwrap_or_else(|_| IMAGE_FOLDER.to_string()),
            part_size_bytes: megabytes_var("UPLOAD_PART_SIZE_MB", PART_SIZE_MB)?,
            part_timeout_secs: env::var("UPLOAD_PART_TIMEOUT_SECS")
                .unwrap_or_else(|_| PART_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(PART_TIMEOUT_SECS),
        };

        let limits = UploadLimits {
            max_template_size_bytes: megabytes_var("MAX_TEMPLATE_SIZE_MB", MAX_TEMPLATE_SIZE_MB)?,
            max_image_size_bytes: megabytes_var("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB)?,
        };

        Ok(Config {
            base,
            storage,
            limits,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.storage.part_size_bytes < MIN_PART_SIZE_BYTES {
            return Err(anyhow::anyhow!(
                "UPLOAD_PART_SIZE_MB must be at least {}",
                MIN_PART_SIZE_BYTES / MIB
            ));
        }

        if self.storage.part_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_PART_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using the S3 storage backend"
            ));
        }

        if !["compact", "json"].contains(&self.base.log_format.as_str()) {
            return Err(anyhow::anyhow!("LOG_FORMAT must be 'compact' or 'json'"));
        }

        Ok(())
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.base.log_format
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.storage.bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.storage.region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.storage.endpoint.as_deref()
    }

    pub fn image_folder(&self) -> &str {
        &self.storage.image_folder
    }

    pub fn max_template_size_bytes(&self) -> usize {
        self.limits.max_template_size_bytes
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.limits.max_image_size_bytes
    }
}

impl Default for Config {
    /// Development defaults: in-memory storage, permissive CORS.
    fn default() -> Self {
        Config {
            base: BaseConfig {
                server_port: SERVER_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                log_format: "compact".to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                bucket: Some("storefront-dev".to_string()),
                region: None,
                endpoint: None,
                access_key_id: None,
                secret_access_key: None,
                image_folder: IMAGE_FOLDER.to_string(),
                part_size_bytes: PART_SIZE_MB * MIB,
                part_timeout_secs: PART_TIMEOUT_SECS,
            },
            limits: UploadLimits {
                max_template_size_bytes: MAX_TEMPLATE_SIZE_MB * MIB,
                max_image_size_bytes: MAX_IMAGE_SIZE_MB * MIB,
            },
        }
    }
}

fn megabytes_var(name: &str, default_mb: usize) -> Result<usize, anyhow::Error> {
    megabytes(name, env::var(name).ok().as_deref(), default_mb)
}

/// Unparseable values fall back to the default; values too large for `usize` bytes are errors.
fn megabytes(name: &str, value: Option<&str>, default_mb: usize) -> Result<usize, anyhow::Error> {
    let mb = value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_mb);
    mb.checked_mul(MIB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, mb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = Config::default();
        config.base.environment = "Production".to_string();
        assert!(config.is_production());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CORS_ORIGINS"));

        config.base.cors_origins = vec!["https://shop.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_part_size_below_s3_minimum_rejected() {
        let mut config = Config::default();
        config.storage.part_size_bytes = MIN_PART_SIZE_BYTES - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_megabytes_converts_and_falls_back() {
        assert_eq!(megabytes("UPLOAD_PART_SIZE_MB", Some("8"), PART_SIZE_MB).unwrap(), 8 * MIB);
        assert_eq!(
            megabytes("UPLOAD_PART_SIZE_MB", None, PART_SIZE_MB).unwrap(),
            PART_SIZE_MB * MIB
        );
        assert_eq!(
            megabytes("UPLOAD_PART_SIZE_MB", Some("lots"), PART_SIZE_MB).unwrap(),
            PART_SIZE_MB * MIB
        );
    }

    #[test]
    fn test_megabytes_overflow_is_an_error() {
        let huge = usize::MAX.to_string();
        let err = megabytes("UPLOAD_PART_SIZE_MB", Some(&huge), PART_SIZE_MB).unwrap_err();
        assert!(err.to_string().contains("UPLOAD_PART_SIZE_MB"));

        let just_over = (usize::MAX / MIB + 1).to_string();
        assert!(megabytes("MAX_IMAGE_SIZE_MB", Some(&just_over), MAX_IMAGE_SIZE_MB).is_err());
        let largest = (usize::MAX / MIB).to_string();
        assert!(megabytes("MAX_IMAGE_SIZE_MB", Some(&largest), MAX_IMAGE_SIZE_MB).is_ok());
    }

    #[test]
    fn test_zero_part_timeout_rejected() {
        let mut config = Config::default();
        config.storage.part_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::S3;
        config.storage.bucket = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let mut config = Config::default();
        config.storage.access_key_id = Some("AKIAEXAMPLE".to_string());
        assert!(!config.storage.has_credentials());
        config.storage.secret_access_key = Some(SecretString::from("secret"));
        assert!(config.storage.has_credentials());
    }
}
