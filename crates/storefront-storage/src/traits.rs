//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.
//! It mirrors the object-store operations the upload endpoints need: the four
//! multipart calls, single-shot puts and deletes.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Missing or rejected credentials, or the store refused to open an upload.
    #[error("Object store unavailable: {0}")]
    StoreUnavailable(String),

    /// Completion requested with no uploaded parts.
    #[error("Incomplete upload: {0}")]
    IncompleteUpload(String),

    #[error("Transport failure on part {part_number}: {message}")]
    TransportFailure { part_number: u32, message: String },

    #[error("Part {got} uploaded out of order, expected part {expected}")]
    PartOutOfOrder { expected: u32, got: u32 },

    #[error("Upload session is already completed or aborted")]
    SessionClosed,

    #[error("Failed to read upload source: {0}")]
    SourceRead(#[source] std::io::Error),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A part accepted by the store, needed to finalize the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number
    pub part_number: u32,
    /// Opaque tag returned by the store (ETag)
    pub e_tag: String,
}

/// Storage abstraction trait
///
/// Every backend targets exactly one bucket. Keys are validated by the caller
/// (see `keys::validate_key`).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Bucket this backend writes to
    fn bucket(&self) -> &str;

    /// Public URL of an object
    fn object_url(&self, key: &str) -> String;

    /// Open a multipart upload and return the store-issued upload id.
    async fn create_multipart_upload(&self, key: &str) -> StorageResult<String>;

    /// Upload one part and return its tag.
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
    ) -> StorageResult<String>;

    /// Assemble the object from the given parts, in order.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> StorageResult<()>;

    /// Cancel a multipart upload and discard its parts.
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> StorageResult<()>;

    /// Upload a small object in one request. Returns its public URL.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str)
        -> StorageResult<String>;

    /// Delete an object by key
    async fn delete_object(&self, key: &str) -> StorageResult<()>;
}
