pub mod gallery;
pub mod payment;
pub mod template;
mod upload_form;
