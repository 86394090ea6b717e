//! The downstream acceptor for intake envelopes.
//!
//! The broker checks shape only: a known form and whatever the installed
//! [`EnvelopeVerifier`] demands. It acknowledges and does not persist.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::TransitConfig;
use crate::error::IntakeError;
use crate::forward::TRANSIT_PATH;
use crate::logging::RequestLog;
use crate::request::RequestMeta;
use crate::schema::FormKind;
use crate::web::{
    finalize, read_json_body, settle, EdgeService, ExtractMetadata, InboundRequest, Reply,
    HEALTH_PATH,
};
use crate::Tainted;

/// Service name used in logs and health replies.
pub const TRANSIT_SERVICE: &str = "transit";

/// Envelope rejected by an [`EnvelopeVerifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("envelope rejected: {reason}")]
pub struct VerificationError {
    /// Why the envelope was refused; logged, never returned to the caller
    pub reason: String,
}

impl VerificationError {
    /// Creates a rejection.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Hook run on every envelope before it is acknowledged.
///
/// Signature or replay checks plug in here. The envelope is raw wire input
/// with only its `form` checked.
pub trait EnvelopeVerifier: Send + Sync {
    /// Accepts or rejects one envelope.
    fn verify(
        &self,
        envelope: &Map<String, Value>,
        meta: &RequestMeta,
    ) -> Result<(), VerificationError>;
}

/// Accepts every envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapVerifier;

impl EnvelopeVerifier for BootstrapVerifier {
    fn verify(
        &self,
        _envelope: &Map<String, Value>,
        _meta: &RequestMeta,
    ) -> Result<(), VerificationError> {
        Ok(())
    }
}

/// Shape-checking acceptor behind `POST /core`.
///
/// # Examples
///
/// ```
/// use form_intake::web::{EdgeService, InboundRequest};
/// use form_intake::{TransitBroker, TransitConfig};
/// use axum::http::{Method, StatusCode};
///
/// # block_on(async {
/// let broker = TransitBroker::new(TransitConfig::default());
/// let reply = broker
///     .handle(InboundRequest::new(Method::POST, "/core").with_body(r#"{"form":"contact"}"#))
///     .await;
///
/// assert_eq!(reply.status(), StatusCode::ACCEPTED);
/// assert_eq!(reply.body().unwrap()["status"], "ack");
/// # });
/// # fn block_on(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct TransitBroker {
    config: TransitConfig,
    verifier: Arc<dyn EnvelopeVerifier>,
}

impl TransitBroker {
    /// Creates a broker with the [`BootstrapVerifier`].
    pub fn new(config: TransitConfig) -> Self {
        Self {
            config,
            verifier: Arc::new(BootstrapVerifier),
        }
    }

    /// Replaces the verifier.
    pub fn with_verifier(mut self, verifier: Arc<dyn EnvelopeVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    async fn accept(
        &self,
        request: &InboundRequest,
        meta: &RequestMeta,
        log: &RequestLog<'_>,
    ) -> Result<Reply, IntakeError> {
        let body = read_json_body(request, self.config.max_body_bytes, IntakeError::InvalidJson)?;

        let envelope = match body.into_inner() {
            Value::Object(map) => Tainted::new(map),
            _ => return Err(IntakeError::InvalidPayload),
        };

        let form = envelope
            .peek()
            .get("form")
            .and_then(Value::as_str)
            .and_then(FormKind::parse)
            .ok_or(IntakeError::UnknownForm)?;

        if let Err(err) = self.verifier.verify(envelope.peek(), meta) {
            log.warn(format_args!("{err} form={form}"));
            return Err(IntakeError::Unauthorized);
        }

        log.info(format_args!("ack form={form}"));
        Ok(Reply::json(
            StatusCode::ACCEPTED,
            json!({
                "ok": true,
                "status": "ack",
                "form": form.as_str(),
                "received_at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        ))
    }
}

impl fmt::Debug for TransitBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitBroker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EdgeService for TransitBroker {
    fn name(&self) -> &str {
        TRANSIT_SERVICE
    }

    fn max_body_bytes(&self) -> usize {
        self.config.max_body_bytes
    }

    async fn handle(&self, request: InboundRequest) -> Reply {
        let meta = request.extract_metadata();
        let log = RequestLog::new(&meta.request_id, TRANSIT_SERVICE);

        let result = match (request.method(), request.path()) {
            (&Method::OPTIONS, _) => Ok(Reply::empty(StatusCode::NO_CONTENT)),
            (&Method::GET, HEALTH_PATH) => Ok(Reply::health(TRANSIT_SERVICE)),
            (&Method::POST, TRANSIT_PATH) => self.accept(&request, &meta, &log).await,
            _ => Err(IntakeError::NotFound),
        };

        let origin = self
            .config
            .allowed_origins
            .allowed_origin(meta.origin.as_deref());
        finalize(settle(result, &log), origin, &meta.request_id)
    }
}
