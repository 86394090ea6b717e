//! Extraction boundary traits and body parsing.
//!
//! Everything that comes off the wire is wrapped in [`Tainted`] here and
//! nowhere else.

use axum::body::Bytes;
use serde_json::Value;

use crate::error::IntakeError;
use crate::request::RequestMeta;
use crate::Tainted;

use super::InboundRequest;

/// Extracts request metadata from a framework-specific request.
///
/// Implementations generate a request ID when the caller did not supply a
/// usable one. They do not authorize anything.
pub trait ExtractMetadata {
    /// Extracts request ID and origin.
    fn extract_metadata(&self) -> RequestMeta;
}

/// Extracts the request body as untrusted bytes.
pub trait ExtractTaintedBody {
    /// Returns `None` when the transport gave up reading an oversized body.
    fn extract_tainted_body(&self) -> Option<Tainted<Bytes>>;
}

/// Reads a capped JSON body.
///
/// Returns [`IntakeError::PayloadTooLarge`] when the body was cut off or is
/// longer than `limit`, and `invalid` when it does not parse as JSON.
pub fn read_json_body(
    request: &InboundRequest,
    limit: usize,
    invalid: IntakeError,
) -> Result<Tainted<Value>, IntakeError> {
    let too_large = || IntakeError::PayloadTooLarge { limit };

    let body = request.extract_tainted_body().ok_or_else(too_large)?;
    if body.peek().len() > limit {
        return Err(too_large());
    }

    let parsed: Result<Value, _> = serde_json::from_slice(body.peek());
    match parsed {
        Ok(value) => Ok(Tainted::new(value)),
        Err(_) => Err(invalid),
    }
}

/// The token of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; an empty token is treated as
/// absent.
pub fn bearer_token(request: &InboundRequest) -> Option<&str> {
    let value = request.header("authorization")?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
