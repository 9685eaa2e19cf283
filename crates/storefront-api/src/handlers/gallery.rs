use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload_form::{file_name, UploadForm};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use storefront_core::models::{
    GalleryImageResponse, GalleryUploadResponse, SessionQuery, StatusResponse,
};
use storefront_core::{convert_filename, AppError, GalleryImage, ProductRef};
use storefront_storage::keys::gallery_key;
use uuid::Uuid;

const GALLERY_FIELD: &str = "filepond";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Gallery images are small enough to buffer and store with a single put.
#[utoipa::path(
    post,
    path = "/admin/product/gallery/upload",
    tag = "admin",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "`session_id` or `product_id`, then the `filepond` image part"
    ),
    responses(
        (status = 200, description = "Image stored", body = GalleryUploadResponse),
        (status = 400, description = "Missing correlation id or empty file", body = ErrorResponse),
        (status = 413, description = "Image exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_gallery(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GalleryUploadResponse>, HttpAppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(field) = form.read_text(field).await? else {
            continue;
        };
        if field.name() != Some(GALLERY_FIELD) {
            continue;
        }

        let product = form.product_ref()?;
        let original_filename = file_name(&field)?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()).into());
        }

        let size_bytes = data.len() as u64;
        let object_key = gallery_key(
            state.config.image_folder(),
            &convert_filename(&original_filename),
        );
        let image_url = state
            .storage
            .put_object(&object_key, data, &content_type)
            .await?;

        let image = GalleryImage {
            id: Uuid::new_v4(),
            product,
            object_key,
            image_url,
            size_bytes,
            uploaded_at: Utc::now(),
        };
        let image_id = image.id;
        let image_url = image.image_url.clone();
        tracing::info!(
            image_id = %image_id,
            product = %image.product,
            object_key = %image.object_key,
            size_bytes,
            "Gallery image uploaded"
        );
        state.assets.add_image(image).await?;

        return Ok(Json(GalleryUploadResponse {
            status: "ok".to_string(),
            message: "Gallery uploaded successfully.".to_string(),
            image_id,
            image_url,
        }));
    }

    Err(AppError::BadRequest(format!("{GALLERY_FIELD} is required")).into())
}

#[utoipa::path(
    get,
    path = "/admin/product/gallery",
    tag = "admin",
    params(SessionQuery),
    responses(
        (status = 200, description = "Images attached to the session, oldest first", body = Vec<GalleryImageResponse>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_gallery_by_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<GalleryImageResponse>>, HttpAppError> {
    let product = ProductRef::from_params(Some(&query.session_id), None)?;
    list_images(&state, &product).await
}

#[utoipa::path(
    get,
    path = "/admin/product/{product_id}/gallery",
    tag = "admin",
    params(("product_id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Images attached to the product, oldest first", body = Vec<GalleryImageResponse>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_gallery_by_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<GalleryImageResponse>>, HttpAppError> {
    let product = ProductRef::from_params(None, Some(&product_id))?;
    list_images(&state, &product).await
}

async fn list_images(
    state: &AppState,
    product: &ProductRef,
) -> Result<Json<Vec<GalleryImageResponse>>, HttpAppError> {
    let images = state.assets.images(product).await?;
    Ok(Json(
        images
            .into_iter()
            .map(|image| GalleryImageResponse {
                id: image.id,
                image_url: image.image_url,
            })
            .collect(),
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/product/image/{image_id}",
    tag = "admin",
    params(("image_id" = Uuid, Path, description = "Gallery image ID")),
    responses(
        (status = 200, description = "Image removed", body = StatusResponse),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 500, description = "Storage error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_gallery_image(
    State(state): State<Arc<AppState>>,
    Path(image_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, HttpAppError> {
    let image = state
        .assets
        .image(image_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    // Record goes only once the object is gone
    state.storage.delete_object(&image.object_key).await?;
    state.assets.take_image(image_id).await?;

    tracing::info!(image_id = %image_id, object_key = %image.object_key, "Gallery image removed");
    Ok(Json(StatusResponse::ok("Image has been removed")))
}
