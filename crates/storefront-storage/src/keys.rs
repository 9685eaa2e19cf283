//! Shared key generation for storage backends.
//!
//! Templates live at the bucket root under their converted filename; gallery
//! images live under the configured image folder.

use crate::traits::{StorageError, StorageResult};

/// Key for a product gallery image: `{folder}/{filename}`.
///
/// An empty folder puts the image at the bucket root.
pub fn gallery_key(folder: &str, filename: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", folder, filename)
    }
}

/// Reject keys that are empty, absolute or have a `..` path segment.
///
/// Dots inside a segment (`spring..sale.zip`) are ordinary filename characters.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
