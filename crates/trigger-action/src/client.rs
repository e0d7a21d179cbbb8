//! Outbound transport to fulfillment endpoints.
//!
//! Defines the `FulfillmentClient` async trait and the reqwest-backed
//! implementation used outside of tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use trigger_core::config::SubmissionConfig;
use trigger_core::types::{FulfillmentResponse, Payload};
use url::Url;

use crate::error::TransportError;

/// Sends one submission and decodes the structured reply.
#[async_trait]
pub trait FulfillmentClient: Send + Sync {
    async fn post(&self, url: &str, payload: &Payload) -> Result<FulfillmentResponse, TransportError>;
}

/// Resolve an action URL, joining relative ones onto `base`.
///
/// Only `http://` and `https://` targets are accepted.
pub fn resolve_url(raw: &str, base: Option<&Url>) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(raw).map_err(|e| invalid(e.to_string()))?,
            None => return Err(invalid("relative URL and no base_url configured".to_string())),
        },
        Err(e) => return Err(invalid(e.to_string())),
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}

/// JSON-over-HTTP client with a per-request timeout.
pub struct HttpFulfillmentClient {
    client: reqwest::Client,
    base_url: Option<Url>,
    timeout: Duration,
}

impl HttpFulfillmentClient {
    pub fn new(config: &SubmissionConfig) -> Result<Self, TransportError> {
        let base_url = match config.base_url.as_deref() {
            Some(raw) => Some(Url::parse(raw).map_err(|e| TransportError::InvalidUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl FulfillmentClient for HttpFulfillmentClient {
    async fn post(&self, url: &str, payload: &Payload) -> Result<FulfillmentResponse, TransportError> {
        let target = resolve_url(url, self.base_url.as_ref())?;

        let response = self
            .client
            .post(target.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    TransportError::from(e)
                }
            })?;

        let status = response.status();
        let body = response.bytes().await?;
        tracing::info!(url = %target, status = status.as_u16(), bytes = body.len(), "Fulfillment responded");

        serde_json::from_slice::<FulfillmentResponse>(&body)
            .map_err(|e| TransportError::MalformedResponse(format!("HTTP {}: {}", status, e)))
    }
}
