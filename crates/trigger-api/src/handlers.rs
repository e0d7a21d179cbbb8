//! Route handler functions for the fulfillment backend.

use axum::extract::{FromRequest, Request, State};
use axum::http::header;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use trigger_core::types::{FulfillmentResponse, Payload};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Extractors
// =============================================================================

/// A submission body sent either as a JSON object or as an urlencoded form.
///
/// Form fields arrive as strings; JSON values are kept as sent. A request
/// without a `Content-Type` yields an empty payload.
#[derive(Debug)]
pub struct SubmissionBody(pub Payload);

impl<S> FromRequest<S> for SubmissionBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        // Without a declared type the body is ignored.
        if content_type.is_empty() {
            return Ok(Self(Payload::new()));
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(Self(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ));
        }

        if !content_type.starts_with("application/json") {
            return Err(ApiError::UnsupportedMediaType(format!(
                "expected application/json or application/x-www-form-urlencoded, got {:?}",
                content_type
            )));
        }

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(ApiError::BadRequest(format!(
                "submission body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST / - hand the submission to the configured fulfillment handler.
pub async fn fulfill(
    State(state): State<AppState>,
    SubmissionBody(payload): SubmissionBody,
) -> Json<FulfillmentResponse> {
    let response = state.handler.fulfill(payload).await;
    if response.code() != Some(0) {
        tracing::warn!(retval = %response.retval, retmsg = %response.retmsg, "Fulfillment declined");
    }
    Json(response)
}

/// GET /health - liveness and uptime.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
