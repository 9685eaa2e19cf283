//! Correlation fields shared by the admin upload forms.

use axum::extract::multipart::Field;
use storefront_core::{AppError, ProductRef};

use crate::error::HttpAppError;

pub(crate) const SESSION_ID_FIELD: &str = "session_id";
pub(crate) const PRODUCT_ID_FIELD: &str = "product_id";

/// `session_id` / `product_id` text fields seen so far.
///
/// Both must be sent before the file part: the file is streamed to storage as
/// soon as it is reached.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    session_id: Option<String>,
    product_id: Option<String>,
}

impl UploadForm {
    /// Consume `field` if it is a correlation field, otherwise hand it back.
    pub(crate) async fn read_text<'a>(
        &mut self,
        field: Field<'a>,
    ) -> Result<Option<Field<'a>>, HttpAppError> {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(SESSION_ID_FIELD) => {
                self.session_id = Some(field.text().await?);
                Ok(None)
            }
            Some(PRODUCT_ID_FIELD) => {
                self.product_id = Some(field.text().await?);
                Ok(None)
            }
            _ => Ok(Some(field)),
        }
    }

    pub(crate) fn product_ref(&self) -> Result<ProductRef, AppError> {
        ProductRef::from_params(self.session_id.as_deref(), self.product_id.as_deref())
    }
}

/// Client filename of a file part; required and non-blank.
pub(crate) fn file_name(field: &Field<'_>) -> Result<String, AppError> {
    field
        .file_name()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::FieldValidation {
            field: field.name().unwrap_or("file").to_string(),
            message: "Uploaded file must have a filename".to_string(),
        })
}
