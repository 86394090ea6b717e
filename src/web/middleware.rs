//! Origin allow-list, CORS and security headers.
//!
//! Every reply an edge service returns passes through [`finalize`], so the
//! security headers are present on errors and preflights alike.

use axum::http::{header, HeaderName, HeaderValue};

use super::Reply;

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "content-type, authorization, x-request-id";
const MAX_AGE_SECONDS: &str = "86400";
const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(), interest-cohort=()";

/// Exact-match allow-list of browser origins.
///
/// An empty list allows nothing. There is no wildcard.
///
/// # Examples
///
/// ```
/// use form_intake::web::OriginPolicy;
///
/// let policy = OriginPolicy::from_csv("https://a.example, https://b.example");
///
/// assert!(policy.is_allowed(Some("https://a.example")));
/// assert!(!policy.is_allowed(Some("https://evil.example")));
/// assert!(!policy.is_allowed(None));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    /// Builds a policy from explicit origins. Blank entries are dropped.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = origins
            .into_iter()
            .map(Into::into)
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self { allowed }
    }

    /// Parses a comma separated list such as `ALLOWED_ORIGINS`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Whether the given `Origin` header value is allow-listed.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        self.allowed_origin(origin).is_some()
    }

    /// Returns the origin back when it is allow-listed.
    pub fn allowed_origin<'a>(&self, origin: Option<&'a str>) -> Option<&'a str> {
        origin.filter(|o| self.allowed.iter().any(|a| a == o))
    }

    /// Number of configured origins.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Whether no origin is allowed.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Adds the JSON, security and CORS headers to a reply.
///
/// CORS headers are only added for an allow-listed origin and always
/// reflect that origin, never `*`.
pub fn finalize(reply: Reply, allowed_origin: Option<&str>, request_id: &str) -> Reply {
    let mut reply = reply
        .with_header(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        )
        .with_header(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        )
        .with_header(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"))
        .with_header(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        )
        .with_header(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static(PERMISSIONS_POLICY),
        );

    if reply.body().is_some() {
        reply = reply.with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    if let Ok(id) = HeaderValue::from_str(request_id) {
        reply = reply.with_header(HeaderName::from_static("x-request-id"), id);
    }

    let Some(origin) = allowed_origin.and_then(|o| HeaderValue::from_str(o).ok()) else {
        return reply;
    };

    reply
        .with_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin)
        .with_header(header::VARY, HeaderValue::from_static("Origin"))
        .with_header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        )
        .with_header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        )
        .with_header(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECONDS),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn csv_trims_and_drops_blanks() {
        let policy = OriginPolicy::from_csv(" https://a.example ,, ");

        assert_eq!(policy.len(), 1);
        assert!(policy.is_allowed(Some("https://a.example")));
    }

    #[test]
    fn empty_policy_allows_nothing() {
        let policy = OriginPolicy::from_csv("");

        assert!(policy.is_empty());
        assert!(!policy.is_allowed(Some("https://a.example")));
    }

    #[test]
    fn matching_is_exact() {
        let policy = OriginPolicy::new(["https://a.example"]);

        assert!(!policy.is_allowed(Some("https://a.example/")));
        assert!(!policy.is_allowed(Some("http://a.example")));
        assert!(!policy.is_allowed(Some("https://a.example.evil")));
    }

    #[test]
    fn security_headers_always_present() {
        let reply = finalize(Reply::json(StatusCode::OK, json!({})), None, "req-1");

        assert_eq!(reply.header("content-type"), Some("application/json"));
        assert_eq!(reply.header("cache-control"), Some("no-store"));
        assert_eq!(reply.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(reply.header("x-frame-options"), Some("DENY"));
        assert_eq!(reply.header("referrer-policy"), Some("no-referrer"));
        assert_eq!(reply.header("permissions-policy"), Some(PERMISSIONS_POLICY));
        assert_eq!(reply.header("x-request-id"), Some("req-1"));
    }

    #[test]
    fn no_cors_headers_without_allowed_origin() {
        let reply = finalize(Reply::empty(StatusCode::NO_CONTENT), None, "req-1");

        assert!(reply.header("access-control-allow-origin").is_none());
        assert!(reply.header("vary").is_none());
        assert!(reply.header("content-type").is_none());
    }

    #[test]
    fn cors_reflects_allowed_origin() {
        let reply = finalize(
            Reply::empty(StatusCode::NO_CONTENT),
            Some("https://a.example"),
            "req-1",
        );

        assert_eq!(
            reply.header("access-control-allow-origin"),
            Some("https://a.example")
        );
        assert_eq!(reply.header("vary"), Some("Origin"));
        assert_eq!(reply.header("access-control-allow-methods"), Some(ALLOW_METHODS));
        assert_eq!(reply.header("access-control-allow-headers"), Some(ALLOW_HEADERS));
        assert_eq!(reply.header("access-control-max-age"), Some("86400"));
    }
}
