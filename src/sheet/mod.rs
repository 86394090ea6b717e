//! Authenticated spreadsheet logger.
//!
//! `POST /log` takes any JSON body from a caller holding the shared bearer
//! token and appends it as one row. Token exchange and the append itself sit
//! behind [`TokenSource`] and [`RowSink`] so tests run without the network.

mod sink;
mod token;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::config::SheetConfig;
use crate::error::IntakeError;
use crate::logging::RequestLog;
use crate::web::{
    bearer_token, finalize, read_json_body, settle, EdgeService, ExtractMetadata, InboundRequest,
    OriginPolicy, Reply, HEALTH_PATH,
};
use crate::Secret;

pub use sink::{RowSink, SheetRow, SheetsRowSink, VecSink};
pub use token::{
    AssertionClaims, ServiceAccountTokenSource, TokenSource, ASSERTION_TTL_SECS,
    JWT_BEARER_GRANT, SHEETS_SCOPE,
};

/// Service name used in logs and health replies.
pub const SHEET_SERVICE: &str = "sheet-logger";

/// Route rows are appended on.
pub const LOG_PATH: &str = "/log";

/// Failure talking to the token endpoint or the spreadsheet API.
///
/// Details are logged; callers only ever see `sheet_error`.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The assertion could not be signed.
    #[error("jwt signing failed: {message}")]
    Jwt {
        /// Signing error
        message: String,
    },

    /// A request failed or answered non-2xx.
    #[error("http error (status {status:?}): {message}")]
    Http {
        /// Response status, when one arrived
        status: Option<u16>,
        /// Transport error or response body
        message: String,
    },

    /// The token endpoint answered without a usable token.
    #[error("token response unusable: {message}")]
    Token {
        /// Decode error
        message: String,
    },

    /// Spreadsheet settings cannot form an endpoint.
    #[error("sheet configuration invalid: {message}")]
    Config {
        /// What was wrong
        message: String,
    },
}

/// Bearer-authenticated row appender behind `POST /log`.
pub struct SheetLogger {
    allowed_origins: OriginPolicy,
    max_body_bytes: usize,
    bearer_token: Secret<String>,
    sink: Arc<dyn RowSink>,
}

impl SheetLogger {
    /// Creates a logger writing to `sink`.
    pub fn new(config: SheetConfig, sink: Arc<dyn RowSink>) -> Self {
        Self {
            allowed_origins: config.allowed_origins,
            max_body_bytes: config.max_body_bytes,
            bearer_token: config.bearer_token,
            sink,
        }
    }

    /// Creates a logger appending to the configured spreadsheet with
    /// service-account credentials. Every Google call is bounded by
    /// `google.timeout`.
    pub fn from_config(config: SheetConfig) -> Result<Self, SheetError> {
        let client = reqwest::Client::builder()
            .timeout(config.google.timeout)
            .build()
            .map_err(|e| SheetError::Config {
                message: e.to_string(),
            })?;
        let tokens = Arc::new(ServiceAccountTokenSource::from_config(
            client.clone(),
            &config.google,
        ));
        let sink = Arc::new(SheetsRowSink::new(client, tokens, &config.google)?);
        Ok(Self::new(config, sink))
    }

    async fn log_row(
        &self,
        request: &InboundRequest,
        log: &RequestLog<'_>,
    ) -> Result<Reply, IntakeError> {
        match bearer_token(request) {
            Some(token) if self.bearer_token.matches(token) => {}
            _ => return Err(IntakeError::Unauthorized),
        }

        let payload = read_json_body(request, self.max_body_bytes, IntakeError::BadJson)?;
        let row = SheetRow::from_payload(&payload);

        if let Err(err) = self.sink.append(&row).await {
            log.error(format_args!("append failed: {err}"));
            return Err(IntakeError::Sheet(err.to_string()));
        }

        log.info(format_args!("row appended bytes={}", row.payload().len()));
        Ok(Reply::json(StatusCode::OK, json!({ "ok": true })))
    }
}

impl fmt::Debug for SheetLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetLogger")
            .field("allowed_origins", &self.allowed_origins)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("bearer_token", &self.bearer_token)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EdgeService for SheetLogger {
    fn name(&self) -> &str {
        SHEET_SERVICE
    }

    fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    async fn handle(&self, request: InboundRequest) -> Reply {
        let meta = request.extract_metadata();
        let log = RequestLog::new(&meta.request_id, SHEET_SERVICE);

        let result = match (request.method(), request.path()) {
            (&Method::OPTIONS, _) => Ok(Reply::empty(StatusCode::NO_CONTENT)),
            (&Method::GET, HEALTH_PATH) => Ok(Reply::health(SHEET_SERVICE)),
            (&Method::POST, LOG_PATH) => self.log_row(&request, &log).await,
            _ => Err(IntakeError::NotFound),
        };

        let origin = self.allowed_origins.allowed_origin(meta.origin.as_deref());
        finalize(settle(result, &log), origin, &meta.request_id)
    }
}
