//! Domain route groups (payment, product templates, product gallery).
//!
//! Upload routes carry their own body limit; everything else keeps axum's default.

use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use storefront_core::Config;

pub fn payment_routes() -> Router<Arc<AppState>> {
    Router::new().route("/payment/card", post(handlers::payment::create_payment))
}

pub fn template_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/product/template/upload",
            post(handlers::template::upload_template)
                .layer(DefaultBodyLimit::max(config.max_template_size_bytes())),
        )
        .route(
            "/admin/product/template",
            get(handlers::template::get_template_by_session)
                .delete(handlers::template::delete_template_by_session),
        )
        .route(
            "/admin/product/{product_id}/template",
            get(handlers::template::get_template_by_product),
        )
        .route(
            "/admin/product/template-by-product",
            delete(handlers::template::delete_template_by_product),
        )
}

pub fn gallery_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/product/gallery/upload",
            post(handlers::gallery::upload_gallery)
                .layer(DefaultBodyLimit::max(config.max_image_size_bytes())),
        )
        .route(
            "/admin/product/gallery",
            get(handlers::gallery::list_gallery_by_session),
        )
        .route(
            "/admin/product/{product_id}/gallery",
            get(handlers::gallery::list_gallery_by_product),
        )
        .route(
            "/admin/product/image/{image_id}",
            delete(handlers::gallery::delete_gallery_image),
        )
}
