//! Storefront Storage Library
//!
//! Object storage abstraction for the storefront backend: the [`Storage`] trait
//! with S3 and in-memory implementations, plus the chunked upload coordinator
//! that streams large files through S3 multipart uploads.
//!
//! # Storage key format
//!
//! - **Templates**: `{converted_filename}` at the bucket root
//! - **Gallery images**: `{image_folder}/{converted_filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod multipart;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use multipart::{ChunkedUploader, MultipartUpload, UploadSession, UploadSettings, UploadState};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use storefront_core::StorageBackend;
pub use traits::{CompletedPart, Storage, StorageError, StorageResult};
