//! The seam between the HTTP surface and fulfillment logic.

use async_trait::async_trait;
use trigger_core::types::{FulfillmentResponse, Payload};

/// Turns one submitted payload into a structured reply.
///
/// Implementations answer with `retval` 0 on success and a non-zero code
/// (conventionally -1, 1 or 2) with a message otherwise.
#[async_trait]
pub trait FulfillmentHandler: Send + Sync {
    async fn fulfill(&self, payload: Payload) -> FulfillmentResponse;
}

/// Logs the request and acknowledges it.
#[derive(Debug, Default, Clone)]
pub struct AcknowledgeHandler;

#[async_trait]
impl FulfillmentHandler for AcknowledgeHandler {
    async fn fulfill(&self, payload: Payload) -> FulfillmentResponse {
        let fields: Vec<&str> = payload.keys().map(String::as_str).collect();
        tracing::info!(
            interaction_id = payload.get("interactionId").and_then(|v| v.as_str()).unwrap_or("-"),
            fields = ?fields,
            "Fulfillment request received"
        );
        FulfillmentResponse::success("Request accepted")
    }
}
