use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::validator::ValidationError;

/// Errors surfaced at the request boundary of every edge service.
///
/// Each variant maps to one HTTP status and a small JSON body of the form
/// `{"ok": false, "error": "<code>", "message"?: "..."}`. None of them are
/// fatal to the process.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Request origin is not in the allow-list.
    #[error("origin not allowed")]
    ForbiddenOrigin,

    /// Request body exceeds the configured byte cap.
    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge {
        /// The configured cap
        limit: usize,
    },

    /// Intake or transit body is not JSON.
    #[error("body is not valid JSON")]
    InvalidJson,

    /// JSON parsed but no field map could be extracted.
    #[error("payload has no field map")]
    InvalidPayload,

    /// Sanitized fields failed schema validation or byte limits.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Envelope names a form the broker does not know.
    #[error("unknown form")]
    UnknownForm,

    /// Missing or wrong bearer token, or envelope verification failed.
    #[error("unauthorized")]
    Unauthorized,

    /// SheetLogger body is not JSON.
    #[error("body is not valid JSON")]
    BadJson,

    /// Token exchange or row append failed.
    #[error("sheet error: {0}")]
    Sheet(String),

    /// Downstream acceptor answered with a non-2xx status.
    #[error("transit rejected with {status}")]
    TransitRejected {
        /// Status forwarded from the downstream
        status: StatusCode,
    },

    /// No route for this method and path.
    #[error("not found")]
    NotFound,
}

impl IntakeError {
    /// Wire code used in the `error` member of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::ForbiddenOrigin => "forbidden_origin",
            IntakeError::PayloadTooLarge { .. } => "payload_too_large",
            IntakeError::InvalidJson => "invalid_json",
            IntakeError::InvalidPayload => "invalid_payload",
            IntakeError::Validation(_) => "validation_error",
            IntakeError::UnknownForm => "unknown_form",
            IntakeError::Unauthorized => "unauthorized",
            IntakeError::BadJson => "bad_json",
            IntakeError::Sheet(_) => "sheet_error",
            IntakeError::TransitRejected { .. } => "transit_rejected",
            IntakeError::NotFound => "not_found",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            IntakeError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IntakeError::InvalidJson
            | IntakeError::InvalidPayload
            | IntakeError::Validation(_)
            | IntakeError::UnknownForm
            | IntakeError::BadJson => StatusCode::BAD_REQUEST,
            IntakeError::Unauthorized => StatusCode::UNAUTHORIZED,
            IntakeError::Sheet(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IntakeError::TransitRejected { status } => *status,
            IntakeError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// JSON body sent to the client.
    ///
    /// Only validation failures carry a message; sheet errors are logged
    /// server-side and never echoed.
    pub fn body(&self) -> Value {
        match self {
            IntakeError::Validation(err) => json!({
                "ok": false,
                "error": self.code(),
                "message": err.to_string(),
            }),
            IntakeError::TransitRejected { status } => json!({
                "ok": false,
                "error": self.code(),
                "status": status.as_u16(),
            }),
            _ => json!({ "ok": false, "error": self.code() }),
        }
    }
}

/// Startup configuration failure. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable or secret is absent or blank.
    #[error("{key} is required but not set")]
    Missing {
        /// Variable name
        key: String,
    },

    /// A variable is set but cannot be used.
    #[error("invalid {key}: {reason}")]
    Invalid {
        /// Variable name
        key: String,
        /// Parse failure
        reason: String,
    },
}
