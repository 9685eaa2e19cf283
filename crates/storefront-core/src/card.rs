//! Payment card number validation, brand detection and masking.
//!
//! A [`CardNumber`] can only be obtained through [`validate`], so holding one means
//! the digits passed the length and brand-policy checks. Its `Debug` and `Display`
//! output is always the masked form. The card security code is wrapped in [`Cvv`],
//! which never prints and can be read exactly once.
//!
//! There is no Luhn (MOD-10) checksum and no BIN table: the brand is derived from
//! the first digit only.

use std::fmt;
use std::ops::RangeInclusive;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIN_CARD_LENGTH: usize = 12;
pub const MAX_CARD_LENGTH: usize = 19;
const MIN_MASKABLE_LENGTH: usize = 8;
const VISIBLE_DIGITS: usize = 4;
const MASK: &str = " **** **** ";
/// Leading four digits refused by business policy (one card family).
const BANNED_PREFIXES: RangeInclusive<u32> = 3528..=3589;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("Invalid card number length: {0} digits")]
    InvalidLength(usize),

    #[error("Card number must contain only digits")]
    InvalidFormat,

    #[error("Card brand is not supported")]
    UnsupportedBrand,
}

/// Coarse card-network classification derived from the leading digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Brand {
    Visa,
    Mastercard,
    Unknown,
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Brand::Visa => write!(f, "VISA"),
            Brand::Mastercard => write!(f, "MASTERCARD"),
            Brand::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A card number that passed [`validate`].
#[derive(Clone, PartialEq, Eq)]
pub struct CardNumber(String);

impl CardNumber {
    pub fn brand(&self) -> Brand {
        brand_of(&self.0)
    }

    /// First and last four digits with the middle masked.
    pub fn masked(&self) -> String {
        // ASCII digits, at least MIN_CARD_LENGTH of them
        format!("{}{MASK}{}", &self.0[..VISIBLE_DIGITS], self.last_four())
    }

    pub fn last_four(&self) -> &str {
        &self.0[self.0.len() - VISIBLE_DIGITS..]
    }

    /// Full digits, for handing to the card network only.
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardNumber").field(&self.masked()).finish()
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Validate a raw card number.
///
/// Whitespace is ignored. The remaining characters must be ASCII digits and there
/// must be between 12 and 19 of them. Numbers whose first four digits fall in
/// 3528-3589 are rejected with [`CardError::UnsupportedBrand`].
pub fn validate(raw_number: &str) -> Result<CardNumber, CardError> {
    let digits: String = raw_number.chars().filter(|c| !c.is_whitespace()).collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidFormat);
    }

    if !(MIN_CARD_LENGTH..=MAX_CARD_LENGTH).contains(&digits.len()) {
        return Err(CardError::InvalidLength(digits.len()));
    }

    if has_banned_prefix(&digits) {
        return Err(CardError::UnsupportedBrand);
    }

    Ok(CardNumber(digits))
}

/// `4` is VISA, `5` is MASTERCARD, anything else is UNKNOWN.
pub fn brand_of(number: &str) -> Brand {
    match number.as_bytes().first() {
        Some(b'4') => Brand::Visa,
        Some(b'5') => Brand::Mastercard,
        _ => Brand::Unknown,
    }
}

/// Mask a card number as `NNNN **** **** NNNN`.
///
/// Numbers shorter than 8 characters cannot be masked without overlapping the
/// visible head and tail and are rejected.
pub fn mask(number: &str) -> Result<String, CardError> {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() < MIN_MASKABLE_LENGTH {
        return Err(CardError::InvalidLength(chars.len()));
    }

    let head: String = chars[..VISIBLE_DIGITS].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE_DIGITS..].iter().collect();
    Ok(format!("{head}{MASK}{tail}"))
}

fn has_banned_prefix(digits: &str) -> bool {
    digits
        .get(..VISIBLE_DIGITS)
        .and_then(|prefix| prefix.parse::<u32>().ok())
        .is_some_and(|prefix| BANNED_PREFIXES.contains(&prefix))
}

/// Card security code.
///
/// Deserializes from a plain string, never serializes, prints as `[REDACTED]`
/// and can only be read by consuming it.
#[derive(Deserialize)]
#[serde(from = "String")]
pub struct Cvv(SecretString);

impl Cvv {
    pub fn new(value: impl Into<String>) -> Self {
        Cvv(SecretString::from(value.into()))
    }

    /// Read the clear value. Consumes the secret.
    pub fn reveal(self) -> String {
        self.0.expose_secret().to_string()
    }
}

impl From<String> for Cvv {
    fn from(value: String) -> Self {
        Cvv(SecretString::from(value))
    }
}

impl fmt::Debug for Cvv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cvv([REDACTED])")
    }
}
