//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SITE_PUBLIC_DIR` - Static marketing pages (default: crates/site/public)
//! - `SITE_ALLOWED_ORIGINS` - Comma-separated CORS origins (default: none)
//! - `SITE_MAX_UPLOAD_BYTES` - Request body limit (default: 12 MiB)
//! - `SITE_CONFIG_MISSING_STATUS` - Status for missing form configuration, 400 or 500 (default: 400)
//! - `LOG_FORMAT` - `json` for structured logs (always JSON on Fly.io)
//!
//! ## Provider
//! - `MAIL_PROVIDER` - `brevo` (default) or `memory`
//! - `BREVO_API_KEY` - Brevo API key (required for `brevo`, high entropy)
//! - `BREVO_BASE_URL` - API base URL (default: <https://api.brevo.com/v3>)
//! - `BREVO_TIMEOUT_SECS` - Outbound request timeout (default: 10)
//!
//! ## Forms
//! - `MAIL_SENDER_EMAIL`, `MAIL_SENDER_NAME` and the per-form keys listed in
//!   [`crate::forms::settings`]
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::StatusCode;
use secrecy::SecretString;
use thiserror::Error;

use crate::forms::FormsConfig;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_BREVO_BASE_URL: &str = "https://api.brevo.com/v3";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory of static pages served as the router fallback
    pub public_dir: PathBuf,
    /// Origins allowed to post forms cross-site
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body, uploads included
    pub max_upload_bytes: usize,
    /// Status returned when a form's server-side configuration is missing
    pub config_missing_status: StatusCode,
    /// Emit JSON logs
    pub log_json: bool,
    /// Which mail provider to talk to
    pub provider: ProviderConfig,
    /// Sender and per-form recipients, lists and templates
    pub forms: FormsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Mail provider selection.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Brevo(BrevoConfig),
    /// Keep everything in memory and log it.
    Memory,
}

/// Brevo API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BrevoConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BrevoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is malformed, the Brevo key is
    /// missing or fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("SITE_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("SITE_PORT", "3000")?;
        let public_dir = PathBuf::from(get_env_or_default("SITE_PUBLIC_DIR", "crates/site/public"));
        let allowed_origins = parse_origins(&get_env_or_default("SITE_ALLOWED_ORIGINS", ""));
        let max_upload_bytes = get_optional_env("SITE_MAX_UPLOAD_BYTES")
            .map(|v| parse_value::<usize>("SITE_MAX_UPLOAD_BYTES", &v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let config_missing_status =
            parse_missing_status(&get_env_or_default("SITE_CONFIG_MISSING_STATUS", "400"))?;
        let log_json = std::env::var("FLY_APP_NAME").is_ok()
            || get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));

        let provider = ProviderConfig::from_env()?;
        let forms = FormsConfig::from_env()?;

        Ok(Self {
            host,
            port,
            public_dir,
            allowed_origins,
            max_upload_bytes,
            config_missing_status,
            log_json,
            provider,
            forms,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Defaults for a local server on an ephemeral port, without any form
    /// settings. Used by tests that build state directly.
    #[must_use]
    pub fn local(provider: ProviderConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            public_dir: PathBuf::from("crates/site/public"),
            allowed_origins: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            config_missing_status: StatusCode::BAD_REQUEST,
            log_json: false,
            provider,
            forms: FormsConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl ProviderConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let kind = get_env_or_default("MAIL_PROVIDER", "brevo").to_ascii_lowercase();
        match kind.as_str() {
            "brevo" => Ok(Self::Brevo(BrevoConfig {
                api_key: get_validated_secret("BREVO_API_KEY")?,
                base_url: get_env_or_default("BREVO_BASE_URL", DEFAULT_BREVO_BASE_URL),
                timeout_secs: parse_env_or_default("BREVO_TIMEOUT_SECS", "10")?,
            })),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "MAIL_PROVIDER".to_string(),
                format!("unknown provider '{other}', expected brevo or memory"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
pub(crate) fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
pub(crate) fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
pub(crate) fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a value, naming the variable it came from on failure.
pub(crate) fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn parse_missing_status(value: &str) -> Result<StatusCode, ConfigError> {
    match value.trim() {
        "400" => Ok(StatusCode::BAD_REQUEST),
        "500" => Ok(StatusCode::INTERNAL_SERVER_ERROR),
        other => Err(ConfigError::InvalidEnvVar(
            "SITE_CONFIG_MISSING_STATUS".to_string(),
            format!("expected 400 or 500, got '{other}'"),
        )),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
