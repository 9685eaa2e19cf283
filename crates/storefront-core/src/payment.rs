//! Card payment processing against a pluggable card network.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::card::{self, CardNumber, Cvv};
use crate::error::AppError;
use crate::models::{PaymentRequest, PaymentResponse, TransactionStatus};

/// Authorization request handed to the card network.
///
/// Owns the security code so the network is the only place it can be revealed.
#[derive(Debug)]
pub struct Authorization {
    pub card: CardNumber,
    pub cvv: Cvv,
    pub expiration_date: String,
    pub cardholder_name: String,
    pub amount: rust_decimal::Decimal,
}

/// Card network collaborator
#[async_trait]
pub trait CardNetwork: Send + Sync {
    async fn authorize(&self, authorization: Authorization) -> Result<TransactionStatus, AppError>;
}

/// Approves every authorization. No gateway is contacted.
#[derive(Debug, Default, Clone)]
pub struct MockCardNetwork;

#[async_trait]
impl CardNetwork for MockCardNetwork {
    async fn authorize(&self, authorization: Authorization) -> Result<TransactionStatus, AppError> {
        tracing::debug!(card = %authorization.card, "Mock network approving authorization");
        Ok(TransactionStatus::Success)
    }
}

/// Validate the card, authorize it and build the response.
///
/// Field-level checks on the request are the caller's job.
pub async fn process_payment(
    network: &dyn CardNetwork,
    request: PaymentRequest,
) -> Result<PaymentResponse, AppError> {
    let card = card::validate(&request.card_number)?;
    let card_brand = card.brand();
    let masked_card_number = card.masked();

    tracing::info!(
        card = %masked_card_number,
        brand = %card_brand,
        "Processing payment"
    );

    let amount = request.amount;
    let transaction_status = network
        .authorize(Authorization {
            card,
            cvv: request.cvv,
            expiration_date: request.expiration_date,
            cardholder_name: request.cardholder_name,
            amount,
        })
        .await?;

    let response = PaymentResponse {
        transaction_id: Uuid::new_v4(),
        amount,
        card_brand,
        masked_card_number,
        transaction_status,
        timestamp: Utc::now(),
    };

    tracing::info!(
        transaction_id = %response.transaction_id,
        status = ?response.transaction_status,
        "Payment processed"
    );

    Ok(response)
}
