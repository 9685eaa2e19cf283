use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size in megabytes rounded to two decimals, as shown in the admin UI.
pub fn size_in_mb(size_bytes: u64) -> f64 {
    (size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Response after a product template upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateUploadResponse {
    pub status: String,
    /// Original filename as sent by the client
    pub template_filename: String,
    /// Size in MB, two decimals
    pub template_filesize: f64,
    /// Object key the template was stored under
    pub object_key: String,
}

/// Response after a product gallery image upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GalleryUploadResponse {
    pub status: String,
    pub message: String,
    pub image_id: Uuid,
    pub image_url: String,
}

/// Template currently attached to a product or editing session
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TemplateInfoResponse {
    pub exists: bool,
    /// Stored object key, not the name the file was uploaded under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_filesize: Option<f64>,
}

/// Generic status/message pair returned by delete endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        StatusResponse {
            status: "ok".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    /// Product editing session
    pub session_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductQuery {
    pub product_id: String,
}

/// Gallery entry as listed in the admin UI
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GalleryImageResponse {
    pub id: Uuid,
    pub image_url: String,
}
