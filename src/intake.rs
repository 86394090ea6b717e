//! Per-form intake handler.
//!
//! One [`IntakeHandler`] serves one form at `POST /ingress/<form>`. A
//! submission moves through a fixed sequence and the first failing step
//! answers the request:
//!
//! ```text
//! origin gate -> body cap -> JSON parse -> field map -> honeypot
//!   -> sanitize -> validate -> byte limits -> envelope -> forward
//! ```
//!
//! The honeypot step runs only when `honeypot_field` is configured.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use crate::config::{Downstream, IntakeConfig};
use crate::envelope::Envelope;
use crate::error::IntakeError;
use crate::forward::{ForwardError, Forwarder, HttpForwarder, InProcessForwarder};
use crate::logging::RequestLog;
use crate::request::RequestMeta;
use crate::sanitizer::sanitize;
use crate::schema::{FormKind, FormSchema};
use crate::transit::TransitBroker;
use crate::validator::{enforce_byte_limits, validate, FieldMap};
use crate::web::{
    finalize, read_json_body, settle, EdgeService, ExtractMetadata, InboundRequest, Reply,
    HEALTH_PATH,
};
use crate::Tainted;

/// Prefix of the submission route; the form identity follows.
pub const INGRESS_PREFIX: &str = "/ingress/";

/// How a valid submission left the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// The downstream acknowledged the envelope (202)
    AcceptedByTransit,
    /// Validated but not delivered: no forwarder, unreachable downstream or
    /// honeypot hit (200)
    ValidatedOnly,
}

impl RelayStatus {
    /// Wire value of the `status` member.
    pub fn as_str(self) -> &'static str {
        match self {
            RelayStatus::AcceptedByTransit => "accepted_by_transit",
            RelayStatus::ValidatedOnly => "validated_only",
        }
    }

    fn http_status(self) -> StatusCode {
        match self {
            RelayStatus::AcceptedByTransit => StatusCode::ACCEPTED,
            RelayStatus::ValidatedOnly => StatusCode::OK,
        }
    }
}

/// Edge handler for one form.
///
/// Built once at startup and shared across requests; holds no per-request
/// state.
pub struct IntakeHandler {
    form: FormKind,
    schema: FormSchema,
    name: String,
    route: String,
    config: IntakeConfig,
    forwarder: Option<Arc<dyn Forwarder>>,
}

impl IntakeHandler {
    /// Creates a handler with no forwarder.
    pub fn new(form: FormKind, config: IntakeConfig) -> Self {
        Self {
            form,
            schema: form.schema(),
            name: format!("intake-{form}"),
            route: format!("{INGRESS_PREFIX}{form}"),
            config,
            forwarder: None,
        }
    }

    /// Creates a handler whose forwarder follows `config.downstream`.
    ///
    /// [`Downstream::InProcess`] builds a co-located [`TransitBroker`] sharing
    /// this handler's origins and body cap.
    pub fn from_config(form: FormKind, config: IntakeConfig) -> Result<Self, ForwardError> {
        let forwarder: Option<Arc<dyn Forwarder>> = match &config.downstream {
            Downstream::None => None,
            Downstream::InProcess => Some(Arc::new(InProcessForwarder::new(
                Arc::new(TransitBroker::new(config.transit())),
                config.forward_timeout,
            ))),
            Downstream::Url(url) => Some(Arc::new(HttpForwarder::new(
                url.clone(),
                config.forward_timeout,
            )?)),
        };

        let handler = Self::new(form, config);
        Ok(match forwarder {
            Some(forwarder) => handler.with_forwarder(forwarder),
            None => handler,
        })
    }

    /// Sets the forwarder.
    pub fn with_forwarder(mut self, forwarder: Arc<dyn Forwarder>) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    /// Form served by this handler.
    pub fn form(&self) -> FormKind {
        self.form
    }

    /// The `POST` route, e.g. `/ingress/join`.
    pub fn route(&self) -> &str {
        &self.route
    }

    async fn ingest(
        &self,
        request: &InboundRequest,
        meta: &RequestMeta,
        log: &RequestLog<'_>,
    ) -> Result<Reply, IntakeError> {
        if !self
            .config
            .allowed_origins
            .is_allowed(meta.origin.as_deref())
        {
            return Err(IntakeError::ForbiddenOrigin);
        }

        let body = read_json_body(request, self.config.max_body_bytes, IntakeError::InvalidJson)?;
        let mut fields = self.field_map(body)?;

        if self.is_honeypot_hit(&mut fields) {
            log.warn(format_args!("honeypot filled, dropping form={}", self.form));
            return Ok(Reply::json(
                RelayStatus::ValidatedOnly.http_status(),
                json!({
                    "ok": true,
                    "status": RelayStatus::ValidatedOnly.as_str(),
                    "form": self.form.as_str(),
                }),
            ));
        }

        let sanitized = fields.map(|map| {
            map.into_iter()
                .map(|(name, value)| {
                    let clean = sanitize(&value);
                    (name, clean)
                })
                .collect::<FieldMap>()
        });

        let verified = validate(self.form.as_str(), &self.schema, sanitized)?;
        enforce_byte_limits(&verified, self.config.max_field_bytes)?;

        let envelope = Envelope::build(&self.config.asset_id, self.form.as_str(), verified);
        let status = self.deliver(&envelope, meta, log).await?;

        log.info(format_args!(
            "submission relayed form={} status={}",
            self.form,
            status.as_str()
        ));

        Ok(Reply::json(
            status.http_status(),
            json!({
                "ok": true,
                "status": status.as_str(),
                "form": envelope.form(),
                "submitted_at": envelope.submitted_at(),
                "fields": envelope.fields(),
            }),
        ))
    }

    /// Extracts the field map from `{form, fields}` or a flat object.
    fn field_map(&self, body: Tainted<Value>) -> Result<Tainted<FieldMap>, IntakeError> {
        let mut object = match body.into_inner() {
            Value::Object(object) => object,
            _ => return Err(IntakeError::InvalidPayload),
        };

        if !object.contains_key("fields") {
            return Ok(Tainted::new(object));
        }

        match object.get("form") {
            None => {}
            Some(Value::String(form)) if form == self.form.as_str() => {}
            Some(_) => return Err(IntakeError::InvalidPayload),
        }

        match object.remove("fields") {
            Some(Value::Object(fields)) => Ok(Tainted::new(fields)),
            _ => Err(IntakeError::InvalidPayload),
        }
    }

    /// Removes the honeypot field, reporting whether it carried a value.
    fn is_honeypot_hit(&self, fields: &mut Tainted<FieldMap>) -> bool {
        let Some(name) = &self.config.honeypot_field else {
            return false;
        };
        if self.schema.field(name).is_some() {
            return false;
        }

        match fields.peek_mut().remove(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    async fn deliver(
        &self,
        envelope: &Envelope,
        meta: &RequestMeta,
        log: &RequestLog<'_>,
    ) -> Result<RelayStatus, IntakeError> {
        let Some(forwarder) = &self.forwarder else {
            return Ok(RelayStatus::ValidatedOnly);
        };

        match forwarder.forward(envelope, &meta.request_id).await {
            Ok(delivery) if delivery.is_success() => Ok(RelayStatus::AcceptedByTransit),
            Ok(delivery) => Err(IntakeError::TransitRejected {
                status: delivery.status,
            }),
            Err(err) => {
                log.warn(format_args!(
                    "{} forward failed, answering validated_only: {err}",
                    forwarder.kind()
                ));
                Ok(RelayStatus::ValidatedOnly)
            }
        }
    }
}

impl fmt::Debug for IntakeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeHandler")
            .field("form", &self.form)
            .field("route", &self.route)
            .field("forwarder", &self.forwarder)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EdgeService for IntakeHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_body_bytes(&self) -> usize {
        self.config.max_body_bytes
    }

    async fn handle(&self, request: InboundRequest) -> Reply {
        let meta = request.extract_metadata();
        let log = RequestLog::new(&meta.request_id, &self.name);

        let result = match (request.method(), request.path()) {
            (&Method::OPTIONS, _) => Ok(Reply::empty(StatusCode::NO_CONTENT)),
            (&Method::GET, HEALTH_PATH) => Ok(Reply::health(&self.name)),
            (&Method::POST, path) if path == self.route => {
                self.ingest(&request, &meta, &log).await
            }
            _ => Err(IntakeError::NotFound),
        };

        let origin = self
            .config
            .allowed_origins
            .allowed_origin(meta.origin.as_deref());
        finalize(settle(result, &log), origin, &meta.request_id)
    }
}
