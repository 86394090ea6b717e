//! Row sinks for the sheet logger.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::config::GoogleConfig;
use crate::Tainted;

use super::token::TokenSource;
use super::SheetError;

/// One appended row: `[timestamp, JSON-stringified payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    timestamp: String,
    payload: String,
}

impl SheetRow {
    /// Serializes an untrusted payload into a row stamped with the current
    /// UTC time.
    ///
    /// The payload is only ever written as one JSON string cell with
    /// `valueInputOption=RAW`, so the spreadsheet never interprets it.
    pub fn from_payload(payload: &Tainted<Value>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            payload: payload.peek().to_string(),
        }
    }

    /// ISO-8601 append time.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The payload as compact JSON text.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The `values` member of an append request.
    pub fn values(&self) -> Value {
        json!([[self.timestamp, self.payload]])
    }
}

/// Destination for sheet rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Appends one row.
    async fn append(&self, row: &SheetRow) -> Result<(), SheetError>;
}

/// Appends rows through the spreadsheet REST API.
pub struct SheetsRowSink {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    append_url: reqwest::Url,
}

impl SheetsRowSink {
    /// Creates a sink for one spreadsheet range.
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        google: &GoogleConfig,
    ) -> Result<Self, SheetError> {
        Ok(Self {
            client,
            tokens,
            append_url: append_url(&google.api_base, &google.sheet_id, &google.range)?,
        })
    }

    /// The fully encoded append endpoint.
    pub fn append_url(&self) -> &str {
        self.append_url.as_str()
    }
}

/// `<base>/spreadsheets/<id>/values/<range>:append?valueInputOption=RAW`
fn append_url(api_base: &str, sheet_id: &str, range: &str) -> Result<reqwest::Url, SheetError> {
    let invalid = |message: String| SheetError::Config { message };

    let mut url = reqwest::Url::parse(api_base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid(format!("{api_base} cannot be a base URL")))?
        .pop_if_empty()
        .extend([
            "spreadsheets",
            sheet_id,
            "values",
            format!("{range}:append").as_str(),
        ]);
    url.query_pairs_mut()
        .append_pair("valueInputOption", "RAW");
    Ok(url)
}

#[async_trait]
impl RowSink for SheetsRowSink {
    async fn append(&self, row: &SheetRow) -> Result<(), SheetError> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(self.append_url.clone())
            .bearer_auth(token.expose_secret())
            .json(&json!({ "values": row.values() }))
            .send()
            .await
            .map_err(|error| SheetError::Http {
                status: None,
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read append response body".to_string());
            return Err(SheetError::Http {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(())
    }
}

/// In-memory sink for tests and dry runs.
///
/// # Examples
///
/// ```
/// use form_intake::sheet::{RowSink, SheetRow, VecSink};
/// use form_intake::Tainted;
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let sink = VecSink::new();
/// sink.append(&SheetRow::from_payload(&Tainted::new(json!({"a": 1})))).await.unwrap();
///
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.rows()[0].payload(), r#"{"a":1}"#);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct VecSink {
    rows: Mutex<Vec<SheetRow>>,
}

impl VecSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows appended.
    pub fn len(&self) -> usize {
        self.with_rows(<[SheetRow]>::len)
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.with_rows(<[SheetRow]>::is_empty)
    }

    /// Borrowed access to the rows via callback.
    pub fn with_rows<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[SheetRow]) -> R,
    {
        match self.rows.lock() {
            Ok(rows) => f(&rows),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// A copy of the rows.
    pub fn rows(&self) -> Vec<SheetRow> {
        self.with_rows(<[SheetRow]>::to_vec)
    }
}

#[async_trait]
impl RowSink for VecSink {
    async fn append(&self, row: &SheetRow) -> Result<(), SheetError> {
        match self.rows.lock() {
            Ok(mut rows) => rows.push(row.clone()),
            Err(poisoned) => poisoned.into_inner().push(row.clone()),
        }
        Ok(())
    }
}
