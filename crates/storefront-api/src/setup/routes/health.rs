//! Liveness probe.

use axum::Json;
use serde_json::{json, Value};

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = inline(Object))
    )
)]
pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
