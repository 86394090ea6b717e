//! Environment configuration.
//!
//! Every service reads its settings once at startup into an owned config
//! struct. Lookups go through a caller-supplied function so tests never
//! touch the process environment; [`env_lookup`] is the production source.

use std::fmt::Display;
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;
use crate::validator::DEFAULT_FIELD_BYTE_CAP;
use crate::web::OriginPolicy;
use crate::Secret;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8787;
/// Default request body cap in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256_000;
/// Default asset identifier stamped on envelopes.
pub const DEFAULT_ASSET_ID: &str = "site";
/// Default downstream timeout in milliseconds.
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 5000;
/// Default bound on one Google API call in milliseconds.
pub const DEFAULT_SHEET_TIMEOUT_MS: u64 = 10_000;
/// Default spreadsheet append range.
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:B";
/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Sheets REST API base.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

const SECRETS_DIR: &str = "/run/secrets";
const IN_PROCESS_BINDING: &str = "in-process";

/// Reads `key` from the process environment, falling back to
/// `/run/secrets/<key>`. Blank values count as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| read_secret_file(&Path::new(SECRETS_DIR).join(key)))
}

fn read_secret_file(path: &Path) -> Option<String> {
    read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn lookup_nonblank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup_nonblank(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup_nonblank(lookup, key).ok_or_else(|| ConfigError::Missing {
        key: key.to_string(),
    })
}

fn origins<F>(lookup: &F) -> OriginPolicy
where
    F: Fn(&str) -> Option<String>,
{
    let policy = OriginPolicy::from_csv(&lookup("ALLOWED_ORIGINS").unwrap_or_default());
    if policy.is_empty() {
        info!("ALLOWED_ORIGINS is empty, every browser origin will be refused");
    }
    policy
}

/// Process-level settings shared by every service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen port
    pub port: u16,
}

impl ServerConfig {
    /// Loads from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Loads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            port: try_load(&lookup, "PORT", DEFAULT_PORT)?,
        })
    }
}

/// Where an intake handler sends envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Downstream {
    /// No forwarder; every valid submission answers `validated_only`
    None,
    /// A transit broker running in the same process
    InProcess,
    /// A transit broker reachable over HTTP
    Url(String),
}

/// Settings for one intake handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    /// Browser origins allowed to submit
    pub allowed_origins: OriginPolicy,
    /// Request body cap
    pub max_body_bytes: usize,
    /// Per-string-leaf byte cap after validation
    pub max_field_bytes: usize,
    /// Asset identifier stamped on envelopes
    pub asset_id: String,
    /// Forwarding target
    pub downstream: Downstream,
    /// Bound on one forward attempt
    pub forward_timeout: Duration,
    /// Hidden field that only bots fill in; `None` disables the check
    pub honeypot_field: Option<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allowed_origins: OriginPolicy::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_field_bytes: DEFAULT_FIELD_BYTE_CAP,
            asset_id: DEFAULT_ASSET_ID.to_string(),
            downstream: Downstream::None,
            forward_timeout: Duration::from_millis(DEFAULT_FORWARD_TIMEOUT_MS),
            honeypot_field: None,
        }
    }
}

impl IntakeConfig {
    /// Loads from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Loads through `lookup`.
    ///
    /// `TRANSIT_BINDING=in-process` takes precedence over `TRANSIT_URL`.
    /// The honeypot check runs only when `HONEYPOT_FIELD` names a field; a
    /// blank value or `-` leaves it off.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let downstream = match lookup_nonblank(&lookup, "TRANSIT_BINDING") {
            Some(binding) if binding.trim() == IN_PROCESS_BINDING => Downstream::InProcess,
            Some(binding) => {
                return Err(ConfigError::Invalid {
                    key: "TRANSIT_BINDING".to_string(),
                    reason: format!("unsupported binding '{}'", binding.trim()),
                })
            }
            None => match lookup_nonblank(&lookup, "TRANSIT_URL") {
                Some(url) => Downstream::Url(url.trim().to_string()),
                None => Downstream::None,
            },
        };

        let honeypot_field = lookup_nonblank(&lookup, "HONEYPOT_FIELD")
            .map(|name| name.trim().to_string())
            .filter(|name| name != "-");

        Ok(Self {
            allowed_origins: origins(&lookup),
            max_body_bytes: try_load(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            max_field_bytes: try_load(&lookup, "MAX_FIELD_BYTES", DEFAULT_FIELD_BYTE_CAP)?,
            asset_id: try_load(&lookup, "ASSET_ID", DEFAULT_ASSET_ID.to_string())?,
            downstream,
            forward_timeout: Duration::from_millis(try_load(
                &lookup,
                "FORWARD_TIMEOUT_MS",
                DEFAULT_FORWARD_TIMEOUT_MS,
            )?),
            honeypot_field,
        })
    }

    /// Settings for a transit broker co-deployed with this handler.
    pub fn transit(&self) -> TransitConfig {
        TransitConfig {
            allowed_origins: self.allowed_origins.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// Settings for the transit broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitConfig {
    /// Origins that receive CORS headers
    pub allowed_origins: OriginPolicy,
    /// Request body cap
    pub max_body_bytes: usize,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            allowed_origins: OriginPolicy::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl TransitConfig {
    /// Loads from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Loads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            allowed_origins: origins(&lookup),
            max_body_bytes: try_load(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        })
    }
}

/// Service-account credentials and spreadsheet target.
#[derive(Debug)]
pub struct GoogleConfig {
    /// Service account e-mail, the JWT issuer
    pub client_email: String,
    /// PEM private key with real newlines
    pub private_key: Secret<String>,
    /// Spreadsheet identifier
    pub sheet_id: String,
    /// A1 range rows are appended to
    pub range: String,
    /// OAuth token endpoint, also the JWT audience
    pub token_uri: String,
    /// Sheets REST API base URL
    pub api_base: String,
    /// Bound on one token exchange or append call
    pub timeout: Duration,
}

/// Settings for the sheet logger.
#[derive(Debug)]
pub struct SheetConfig {
    /// Origins that receive CORS headers
    pub allowed_origins: OriginPolicy,
    /// Request body cap
    pub max_body_bytes: usize,
    /// Shared bearer token callers must present
    pub bearer_token: Secret<String>,
    /// Spreadsheet access
    pub google: GoogleConfig,
}

impl SheetConfig {
    /// Loads from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Loads through `lookup`. Missing secrets are an error here, never at
    /// request time.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let private_key = require(&lookup, "GOOGLE_PRIVATE_KEY")?.replace("\\n", "\n");

        Ok(Self {
            allowed_origins: origins(&lookup),
            max_body_bytes: try_load(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            bearer_token: Secret::new(require(&lookup, "SHEET_LOGGER_TOKEN")?),
            google: GoogleConfig {
                client_email: require(&lookup, "GOOGLE_CLIENT_EMAIL")?,
                private_key: Secret::new(private_key),
                sheet_id: require(&lookup, "SHEET_ID")?,
                range: try_load(&lookup, "SHEET_RANGE", DEFAULT_SHEET_RANGE.to_string())?,
                token_uri: try_load(&lookup, "GOOGLE_TOKEN_URI", DEFAULT_TOKEN_URI.to_string())?,
                api_base: SHEETS_API_BASE.to_string(),
                timeout: Duration::from_millis(try_load(
                    &lookup,
                    "SHEET_TIMEOUT_MS",
                    DEFAULT_SHEET_TIMEOUT_MS,
                )?),
            },
        })
    }
}
