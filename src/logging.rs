use std::fmt;

use tracing_subscriber::EnvFilter;

/// Per-request logging handle.
///
/// Every message carries the request ID and the name of the service that
/// produced it, so a submission can be followed from intake through transit.
///
/// Field values are never logged; only field names, form identities and
/// outcomes. [`crate::Secret`] values redact themselves if they slip into a
/// format string.
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
    service: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger bound to one request.
    pub fn new(request_id: &'a str, service: &'a str) -> Self {
        Self {
            request_id,
            service,
        }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// ```
    /// # use form_intake::RequestLog;
    /// let log = RequestLog::new("req-1", "intake-contact");
    /// log.info(format_args!("accepted form={}", "contact"));
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, service = %self.service, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, service = %self.service, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, service = %self.service, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, service = %self.service, "{}", args);
    }
}

/// Installs the global `fmt` subscriber.
///
/// The filter comes from `RUST_LOG` and falls back to `info` for this crate
/// and `tower_http`. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("form_intake=info,tower_http=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_request_id() {
        let log = RequestLog::new("req-42", "transit");
        assert_eq!(log.request_id(), "req-42");
    }

    #[test]
    fn logging_without_subscriber_is_a_no_op() {
        let log = RequestLog::new("req-1", "sheet-logger");
        log.info(format_args!("one"));
        log.warn(format_args!("two"));
        log.error(format_args!("three"));
        log.debug(format_args!("four"));
    }

    #[test]
    fn init_tracing_twice_does_not_panic() {
        init_tracing();
        init_tracing();
    }
}
