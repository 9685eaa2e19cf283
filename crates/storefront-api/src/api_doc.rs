//! OpenAPI documentation, served as JSON and rendered with RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes::health;
use storefront_core::{models, Brand};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "Card payments and product asset uploads for the storefront admin"
    ),
    paths(
        health::healthcheck,
        handlers::payment::create_payment,
        handlers::template::upload_template,
        handlers::template::get_template_by_session,
        handlers::template::get_template_by_product,
        handlers::template::delete_template_by_session,
        handlers::template::delete_template_by_product,
        handlers::gallery::upload_gallery,
        handlers::gallery::list_gallery_by_session,
        handlers::gallery::list_gallery_by_product,
        handlers::gallery::delete_gallery_image,
    ),
    components(schemas(
        error::ErrorResponse,
        Brand,
        models::PaymentRequest,
        models::PaymentResponse,
        models::TransactionStatus,
        models::TemplateUploadResponse,
        models::TemplateInfoResponse,
        models::GalleryUploadResponse,
        models::GalleryImageResponse,
        models::StatusResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "payment", description = "Card payments"),
        (name = "admin", description = "Product templates and gallery images")
    )
)]
pub struct ApiDoc;
