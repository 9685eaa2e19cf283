//! Request bodies and multipart forms.

use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

/// Deterministic, non-repeating-per-part file content.
pub fn file_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn payment_body(card_number: &str) -> Value {
    json!({
        "card_number": card_number,
        "expiration_date": "12/27",
        "cvv": "123",
        "amount": 49.99,
        "cardholder_name": "Ada Lovelace"
    })
}

pub fn file_part(data: Vec<u8>, file_name: &str, mime_type: &str) -> Part {
    Part::bytes(bytes::Bytes::from(data))
        .file_name(file_name)
        .mime_type(mime_type)
}

pub fn template_form_for_session(session_id: &str, data: Vec<u8>, file_name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("session_id", session_id)
        .add_part("template_file", file_part(data, file_name, "application/zip"))
}

pub fn template_form_for_product(product_id: &str, data: Vec<u8>, file_name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("product_id", product_id)
        .add_part("template_file", file_part(data, file_name, "application/zip"))
}

pub fn gallery_form_for_session(session_id: &str, data: Vec<u8>, file_name: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("session_id", session_id)
        .add_part("filepond", file_part(data, file_name, "image/png"))
}
