//! Storefront HTTP API.
//!
//! The binary in `main.rs` only loads configuration and serves the router built
//! by [`setup::initialize_app`]; tests build the same router around their own
//! state with [`setup::routes::setup_routes`].

mod api_doc;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use error::ErrorResponse;
pub use state::AppState;
