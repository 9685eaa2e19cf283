//! Storefront Core Library
//!
//! Domain types shared by the storage and API crates: configuration, the unified
//! error type, card validation and masking, payment models, object filename
//! derivation and the product asset registry.

pub mod assets;
pub mod card;
pub mod config;
pub mod error;
pub mod filename;
pub mod models;
pub mod payment;
pub mod storage_types;

// Re-export commonly used types
pub use assets::{GalleryImage, InMemoryProductAssets, ProductAssets, ProductRef, TemplateRecord};
pub use card::{Brand, CardError, CardNumber, Cvv};
pub use config::{BaseConfig, Config, StorageConfig, UploadLimits};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use filename::convert_filename;
pub use payment::{CardNetwork, MockCardNetwork};
pub use storage_types::StorageBackend;
