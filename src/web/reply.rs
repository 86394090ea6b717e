//! Framework-neutral response type.

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::{json, Value};

use crate::error::IntakeError;

/// A response produced by an edge service.
///
/// The body, when present, is always JSON. Headers set here are merged with
/// the security and CORS headers every service adds before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Value>,
}

impl Reply {
    /// A JSON reply.
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// A reply without a body, used for preflight.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The `{ok: false, error, message?}` reply for an error.
    pub fn error(err: &IntakeError) -> Self {
        Self::json(err.status(), err.body())
    }

    /// The `GET /.well-known/health` reply.
    pub fn health(service: &str) -> Self {
        Self::json(
            StatusCode::OK,
            json!({
                "ok": true,
                "service": service,
                "version": env!("CARGO_PKG_VERSION"),
            }),
        )
    }

    /// Sets a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Splits the reply for a framework adapter.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<Value>) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reply_uses_error_status_and_body() {
        let reply = Reply::error(&IntakeError::ForbiddenOrigin);

        assert_eq!(reply.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            reply.body(),
            Some(&json!({"ok": false, "error": "forbidden_origin"}))
        );
    }

    #[test]
    fn health_reply_names_service() {
        let reply = Reply::health("transit");
        let body = reply.body().unwrap();

        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["service"], "transit");
        assert!(body["version"].is_string());
    }

    #[test]
    fn empty_reply_has_no_body() {
        let reply = Reply::empty(StatusCode::NO_CONTENT);
        assert!(reply.body().is_none());
    }
}
