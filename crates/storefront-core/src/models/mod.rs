//! Request and response models for the storefront API
//!
//! Organized by feature area; everything is re-exported here for convenient imports.

mod payment;
mod upload;

pub use payment::*;
pub use upload::*;
