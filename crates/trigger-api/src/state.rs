//! Application state shared across all route handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use trigger_core::config::ServerConfig;

use crate::fulfillment::{AcknowledgeHandler, FulfillmentHandler};

/// Shared application state.
///
/// All fields use `Arc` or are cheap to clone across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Handles POST / bodies.
    pub handler: Arc<dyn FulfillmentHandler>,
    /// Directory served under `/public`.
    pub public_dir: PathBuf,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &ServerConfig, handler: Arc<dyn FulfillmentHandler>) -> Self {
        Self {
            handler,
            public_dir: PathBuf::from(&config.public_dir),
            start_time: Instant::now(),
        }
    }

    /// State backed by [`AcknowledgeHandler`].
    pub fn acknowledging(config: &ServerConfig) -> Self {
        Self::new(config, Arc::new(AcknowledgeHandler))
    }
}
