//! Delivery of envelopes to the downstream acceptor.
//!
//! An intake handler is built with at most one [`Forwarder`]. The choice
//! between an in-process binding and an HTTP URL is made once at
//! construction; the handler only sees the trait.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderValue, Method, StatusCode};
use thiserror::Error;

use crate::envelope::Envelope;
use crate::web::{EdgeService, InboundRequest};

/// Route the transit broker accepts envelopes on.
pub const TRANSIT_PATH: &str = "/core";

/// Outcome of a delivery that reached the downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Status the downstream answered with
    pub status: StatusCode,
}

impl Delivery {
    /// Whether the downstream accepted the envelope.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The downstream could not be reached.
///
/// Intake handlers swallow these and answer `validated_only`.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection, DNS or protocol failure.
    #[error("downstream unreachable: {0}")]
    Unreachable(String),

    /// No answer within the configured timeout.
    #[error("downstream timed out after {0:?}")]
    Timeout(Duration),

    /// The envelope could not be serialized.
    #[error("envelope encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sends an envelope downstream.
#[async_trait]
pub trait Forwarder: Send + Sync + fmt::Debug {
    /// Short label for logs (`in-process`, `http`).
    fn kind(&self) -> &'static str;

    /// Delivers one envelope. `request_id` is propagated as `x-request-id`.
    async fn forward(&self, envelope: &Envelope, request_id: &str)
        -> Result<Delivery, ForwardError>;
}

/// Delivers to a co-deployed service through its [`EdgeService`] interface.
pub struct InProcessForwarder {
    target: Arc<dyn EdgeService>,
    timeout: Duration,
}

impl InProcessForwarder {
    /// Binds to a service instance.
    pub fn new(target: Arc<dyn EdgeService>, timeout: Duration) -> Self {
        Self { target, timeout }
    }
}

impl fmt::Debug for InProcessForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessForwarder")
            .field("target", &self.target.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Forwarder for InProcessForwarder {
    fn kind(&self) -> &'static str {
        "in-process"
    }

    async fn forward(
        &self,
        envelope: &Envelope,
        request_id: &str,
    ) -> Result<Delivery, ForwardError> {
        let body = serde_json::to_vec(envelope)?;
        let request = InboundRequest::new(Method::POST, TRANSIT_PATH)
            .with_header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .with_request_id(request_id)
            .with_body(body);

        let reply = tokio::time::timeout(self.timeout, self.target.handle(request))
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))?;

        Ok(Delivery {
            status: reply.status(),
        })
    }
}

/// Delivers by POSTing JSON to a URL.
#[derive(Debug)]
pub struct HttpForwarder {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpForwarder {
    /// Builds a forwarder with its own client and a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn forward(
        &self,
        envelope: &Envelope,
        request_id: &str,
    ) -> Result<Delivery, ForwardError> {
        let response = self
            .client
            .post(&self.url)
            .header("x-request-id", request_id)
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardError::Timeout(self.timeout)
                } else {
                    ForwardError::Unreachable(e.to_string())
                }
            })?;

        Ok(Delivery {
            status: response.status(),
        })
    }
}
