//! OAuth access tokens from a service-account key.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::Secret;

use super::SheetError;

/// Scope requested for spreadsheet appends.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Grant type of the signed-assertion exchange.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of one signed assertion, in seconds.
pub const ASSERTION_TTL_SECS: i64 = 3600;

/// Produces bearer tokens for the spreadsheet API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a fresh access token.
    async fn access_token(&self) -> Result<Secret<String>, SheetError>;
}

/// Claims of the signed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account e-mail
    pub iss: String,
    /// Requested scope
    pub scope: String,
    /// Token endpoint
    pub aud: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, `iat + 3600`
    pub exp: i64,
}

/// Exchanges an RS256-signed assertion for an access token.
///
/// Every call signs and exchanges a new assertion; nothing is cached.
pub struct ServiceAccountTokenSource {
    client: reqwest::Client,
    client_email: String,
    private_key: Secret<String>,
    token_uri: String,
}

impl ServiceAccountTokenSource {
    /// Creates a source from explicit credentials.
    pub fn new(
        client: reqwest::Client,
        client_email: impl Into<String>,
        private_key: Secret<String>,
        token_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_email: client_email.into(),
            private_key,
            token_uri: token_uri.into(),
        }
    }

    /// Creates a source from the sheet logger's Google settings.
    pub fn from_config(client: reqwest::Client, google: &GoogleConfig) -> Self {
        Self::new(
            client,
            google.client_email.clone(),
            Secret::new(google.private_key.expose_secret().clone()),
            google.token_uri.clone(),
        )
    }

    /// Claims for an assertion issued at `now`.
    pub fn claims(&self, now: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        }
    }

    /// Signs an assertion issued at `now`.
    pub fn assertion(&self, now: i64) -> Result<String, SheetError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|error| SheetError::Jwt {
                message: error.to_string(),
            })?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &self.claims(now), &key).map_err(
            |error| SheetError::Jwt {
                message: error.to_string(),
            },
        )
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<Secret<String>, SheetError> {
        #[derive(Debug, Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let assertion = self.assertion(Utc::now().timestamp())?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
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
                .unwrap_or_else(|_| "unable to read token response body".to_string());
            return Err(SheetError::Http {
                status: Some(status.as_u16()),
                message,
            });
        }

        let payload: TokenResponse =
            response
                .json()
                .await
                .map_err(|error| SheetError::Token {
                    message: error.to_string(),
                })?;

        Ok(Secret::new(payload.access_token))
    }
}
