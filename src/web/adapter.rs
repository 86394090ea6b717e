//! Framework-neutral request type.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};

use crate::request::RequestMeta;
use crate::Tainted;

use super::{ExtractMetadata, ExtractTaintedBody};

/// Longest inbound `x-request-id` that is propagated instead of replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Body of an inbound request as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// The full body, already read into memory
    Complete(Bytes),
    /// The transport stopped reading because the body exceeded its cap
    Oversized,
}

/// An HTTP request reduced to what the services need.
///
/// Framework code builds one of these from its own request type; the
/// services never see framework types. Tests build them directly.
///
/// # Examples
///
/// ```
/// use form_intake::web::{ExtractMetadata, InboundRequest};
/// use axum::http::Method;
///
/// let request = InboundRequest::new(Method::POST, "/contact")
///     .with_origin("https://example.com")
///     .with_request_id("req-7")
///     .with_body(r#"{"Name":"Jo"}"#);
///
/// let meta = request.extract_metadata();
/// assert_eq!(meta.request_id, "req-7");
/// assert_eq!(meta.origin.as_deref(), Some("https://example.com"));
/// ```
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: RequestBody,
}

impl InboundRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Complete(Bytes::new()),
        }
    }

    /// Creates a request from parts a framework has already split.
    pub fn from_parts(
        method: Method,
        path: impl Into<String>,
        headers: HeaderMap,
        body: RequestBody,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body,
        }
    }

    /// Adds a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the `Origin` header. Values that are not valid header text are
    /// dropped.
    pub fn with_origin(self, origin: &str) -> Self {
        self.with_text_header(header::ORIGIN, origin)
    }

    /// Sets the `x-request-id` header.
    pub fn with_request_id(self, request_id: &str) -> Self {
        self.with_text_header(HeaderName::from_static("x-request-id"), request_id)
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_text_header(header::AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Complete(body.into());
        self
    }

    /// Marks the body as cut off by the transport.
    pub fn with_oversized_body(mut self) -> Self {
        self.body = RequestBody::Oversized;
        self
    }

    fn with_text_header(self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => self.with_header(name, value),
            Err(_) => self,
        }
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body state.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }
}

impl ExtractMetadata for InboundRequest {
    fn extract_metadata(&self) -> RequestMeta {
        let request_id = self
            .header("x-request-id")
            .filter(|id| is_acceptable_request_id(id))
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        RequestMeta {
            request_id,
            origin: self.header(header::ORIGIN.as_str()).map(str::to_string),
        }
    }
}

impl ExtractTaintedBody for InboundRequest {
    fn extract_tainted_body(&self) -> Option<Tainted<Bytes>> {
        match &self.body {
            RequestBody::Complete(bytes) => Some(Tainted::new(bytes.clone())),
            RequestBody::Oversized => None,
        }
    }
}

fn is_acceptable_request_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
