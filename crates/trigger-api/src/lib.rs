//! Trigger API crate - fulfillment backend over axum.
//!
//! Accepts submissions on `POST /` as JSON or urlencoded forms, hands them
//! to a [`FulfillmentHandler`], and serves static widget assets.

pub mod error;
pub mod fulfillment;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use fulfillment::{AcknowledgeHandler, FulfillmentHandler};
pub use routes::{create_router, start_server};
pub use state::AppState;
