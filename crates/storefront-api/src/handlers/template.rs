//! Product template files.
//!
//! Templates can be hundreds of megabytes, so the file part is never buffered:
//! it is streamed into a chunked multipart upload as it arrives.

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload_form::{file_name, UploadForm};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::Utc;
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use storefront_core::models::{
    size_in_mb, ProductQuery, SessionQuery, StatusResponse, TemplateInfoResponse,
    TemplateUploadResponse,
};
use storefront_core::{convert_filename, AppError, ProductRef, TemplateRecord};
use tokio_util::io::StreamReader;

const TEMPLATE_FIELD: &str = "template_file";

#[utoipa::path(
    post,
    path = "/admin/product/template/upload",
    tag = "admin",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "`session_id` or `product_id`, then the `template_file` part"
    ),
    responses(
        (status = 200, description = "Template stored", body = TemplateUploadResponse),
        (status = 400, description = "Missing correlation id, file or filename", body = ErrorResponse),
        (status = 413, description = "File exceeds the template size limit", body = ErrorResponse),
        (status = 502, description = "Transfer to object storage failed", body = ErrorResponse),
        (status = 503, description = "Object storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_template(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TemplateUploadResponse>, HttpAppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(field) = form.read_text(field).await? else {
            continue;
        };
        if field.name() != Some(TEMPLATE_FIELD) {
            continue;
        }

        let product = form.product_ref()?;
        let original_filename = file_name(&field)?;
        let object_key = convert_filename(&original_filename);

        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        let session = state.uploader.upload(&object_key, &mut reader).await?;

        tracing::info!(
            product = %product,
            object_key = %object_key,
            size_bytes = session.bytes_transferred,
            parts = session.parts.len(),
            "Template uploaded"
        );

        let record = TemplateRecord {
            object_key: object_key.clone(),
            original_filename: original_filename.clone(),
            size_bytes: session.bytes_transferred,
            uploaded_at: Utc::now(),
        };
        if let Some(replaced) = state.assets.set_template(&product, record).await? {
            remove_replaced(&state, &replaced.object_key, &object_key).await;
        }

        return Ok(Json(TemplateUploadResponse {
            status: "ok".to_string(),
            template_filename: original_filename,
            template_filesize: size_in_mb(session.bytes_transferred),
            object_key,
        }));
    }

    Err(AppError::BadRequest(format!("{TEMPLATE_FIELD} is required")).into())
}

/// Best effort: the new template is already recorded.
async fn remove_replaced(state: &AppState, replaced_key: &str, current_key: &str) {
    if replaced_key == current_key {
        return;
    }
    if let Err(e) = state.storage.delete_object(replaced_key).await {
        tracing::warn!(
            error = %e,
            object_key = %replaced_key,
            "Failed to delete replaced template"
        );
    }
}

#[utoipa::path(
    get,
    path = "/admin/product/template",
    tag = "admin",
    params(SessionQuery),
    responses(
        (status = 200, description = "Template attached to the session", body = TemplateInfoResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_template_by_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<TemplateInfoResponse>, HttpAppError> {
    let product = ProductRef::from_params(Some(&query.session_id), None)?;
    template_info(&state, &product).await
}

#[utoipa::path(
    get,
    path = "/admin/product/{product_id}/template",
    tag = "admin",
    params(("product_id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Template attached to the product", body = TemplateInfoResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_template_by_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
) -> Result<Json<TemplateInfoResponse>, HttpAppError> {
    let product = ProductRef::from_params(None, Some(&product_id))?;
    template_info(&state, &product).await
}

async fn template_info(
    state: &AppState,
    product: &ProductRef,
) -> Result<Json<TemplateInfoResponse>, HttpAppError> {
    let info = match state.assets.template(product).await? {
        Some(record) => TemplateInfoResponse {
            exists: true,
            template_filename: Some(record.object_key),
            template_filesize: Some(size_in_mb(record.size_bytes)),
        },
        None => TemplateInfoResponse {
            exists: false,
            template_filename: None,
            template_filesize: None,
        },
    };
    Ok(Json(info))
}

#[utoipa::path(
    delete,
    path = "/admin/product/template",
    tag = "admin",
    params(SessionQuery),
    responses(
        (status = 200, description = "Template removed", body = StatusResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_template_by_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<StatusResponse>, HttpAppError> {
    let product = ProductRef::from_params(Some(&query.session_id), None)?;
    remove_template(&state, &product).await
}

#[utoipa::path(
    delete,
    path = "/admin/product/template-by-product",
    tag = "admin",
    params(ProductQuery),
    responses(
        (status = 200, description = "Template removed", body = StatusResponse),
        (status = 404, description = "Unknown product", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_template_by_product(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<StatusResponse>, HttpAppError> {
    let product = ProductRef::from_params(None, Some(&query.product_id))?;
    remove_template(&state, &product).await
}

/// The stored object is deleted before the record is detached, so a storage
/// failure leaves the template listed and the delete can be retried.
async fn remove_template(
    state: &AppState,
    product: &ProductRef,
) -> Result<Json<StatusResponse>, HttpAppError> {
    if !state.assets.contains_product(product).await? {
        return Err(AppError::NotFound("Product not found".to_string()).into());
    }

    if let Some(record) = state.assets.template(product).await? {
        state.storage.delete_object(&record.object_key).await?;
        state.assets.take_template(product).await?;
        tracing::info!(product = %product, object_key = %record.object_key, "Template removed");
    }

    Ok(Json(StatusResponse::ok("Your template file has been removed")))
}
