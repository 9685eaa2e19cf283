use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::card::{self, Brand, Cvv};

/// Card payment request
#[derive(Deserialize, ToSchema, Validate)]
pub struct PaymentRequest {
    /// Card number, 12 to 19 digits (spaces allowed)
    #[schema(example = "4111111111111111")]
    #[validate(length(min = 1, message = "Card number is required"))]
    pub card_number: String,
    /// Expiration date as printed on the card, e.g. "12/27"
    #[validate(length(
        min = 1,
        max = 7,
        message = "Expiration date must be between 1 and 7 characters"
    ))]
    pub expiration_date: String,
    /// Card security code. Accepted, never returned or logged.
    #[schema(value_type = String, write_only)]
    pub cvv: Cvv,
    #[schema(value_type = f64, example = 49.99)]
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Cardholder name must be between 1 and 100 characters"
    ))]
    pub cardholder_name: String,
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let card_number = card::mask(&self.card_number).unwrap_or_else(|_| "[invalid]".into());
        f.debug_struct("PaymentRequest")
            .field("card_number", &card_number)
            .field("expiration_date", &self.expiration_date)
            .field("cvv", &self.cvv)
            .field("amount", &self.amount)
            .field("cardholder_name", &self.cardholder_name)
            .finish()
    }
}

fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("Amount must be greater than 0".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Canceled,
}

/// Result of a card payment. Never carries the security code.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub transaction_id: Uuid,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub card_brand: Brand,
    #[schema(example = "4111 **** **** 1111")]
    pub masked_card_number: String,
    pub transaction_status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
}
