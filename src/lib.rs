//! Edge services that sanitize, validate and relay website form submissions.
//!
//! A browser posts a form to an [`IntakeHandler`]. The handler gates the
//! origin and body size, sanitizes every value, validates the result against
//! the form's [`schema`], wraps it in an [`Envelope`] and forwards it to a
//! [`TransitBroker`]. A separate [`SheetLogger`] appends authenticated JSON
//! payloads to a spreadsheet.
//!
//! ```text
//! browser -> IntakeHandler (contact | join) -> TransitBroker
//!                              SheetLogger (authenticated append)
//! ```
//!
//! # Core Types
//!
//! - [`Tainted<T>`]: raw wire input; only this crate can unwrap it
//! - [`Verified<T>`]: proof that fields passed [`validate`]
//! - [`Envelope`]: the normalized unit relayed downstream
//! - [`Secret<T>`]: redacting wrapper with constant-time comparison
//! - [`web::EdgeService`]: the framework-neutral service interface
//!
//! # Examples
//!
//! ```
//! use form_intake::{sanitize, schema, validate, Envelope, Tainted};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "Name": " <b>Jo</b> ",
//!     "Email": "a@b.co",
//!     "What are you interested in?": "IT Support",
//! });
//!
//! let cleaned = Tainted::new(raw.as_object().unwrap().clone())
//!     .map(|fields| fields.into_iter().map(|(k, v)| (k, sanitize(&v))).collect());
//! let fields = validate("join", &schema::join(), cleaned).expect("valid submission");
//! let envelope = Envelope::build("site", "join", fields);
//!
//! assert_eq!(envelope.fields()["Name"], "Jo");
//! assert_eq!(envelope.fields()["Services"], json!([]));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod envelope;
mod error;
pub mod forward;
mod intake;
mod logging;
mod request;
pub mod sanitizer;
pub mod schema;
mod secret;
pub mod server;
pub mod sheet;
mod tainted;
mod transit;
mod validator;
mod verified;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use config::{
    Downstream, GoogleConfig, IntakeConfig, ServerConfig, SheetConfig, TransitConfig,
};
pub use envelope::{Envelope, ENVELOPE_SCHEMA};
pub use error::{ConfigError, IntakeError};
pub use forward::{Delivery, ForwardError, Forwarder, HttpForwarder, InProcessForwarder};
pub use intake::{IntakeHandler, RelayStatus, INGRESS_PREFIX};
pub use logging::{init_tracing, RequestLog};
pub use request::RequestMeta;
pub use sanitizer::sanitize;
pub use schema::FormKind;
pub use secret::Secret;
pub use sheet::{SheetLogger, LOG_PATH};
pub use tainted::Tainted;
pub use transit::{
    BootstrapVerifier, EnvelopeVerifier, TransitBroker, VerificationError, TRANSIT_SERVICE,
};
pub use validator::{
    enforce_byte_limits, validate, FieldMap, ValidationError, ValidationErrorKind,
    DEFAULT_FIELD_BYTE_CAP, MAX_ARRAY_ITEMS, MAX_ARRAY_TOTAL_BYTES, MAX_ITEM_BYTES,
};
pub use verified::Verified;
