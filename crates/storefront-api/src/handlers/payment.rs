use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use storefront_core::models::{PaymentRequest, PaymentResponse};
use storefront_core::payment::process_payment;
use validator::Validate;

/// Validate a card and authorize the payment against the card network.
///
/// The response carries the brand and masked number only; the security code is
/// never echoed.
#[utoipa::path(
    post,
    path = "/payment/card",
    tag = "payment",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment processed", body = PaymentResponse),
        (status = 400, description = "Invalid card or request field", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PaymentRequest>,
) -> Result<Json<PaymentResponse>, HttpAppError> {
    request.validate()?;
    let response = process_payment(state.card_network.as_ref(), request).await?;
    Ok(Json(response))
}
