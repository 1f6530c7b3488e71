//! Checkout service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_BASE_URL` - Public URL for the checkout service
//! - `PLATFORM_URL` - Base URL of the commerce platform API
//! - `PLATFORM_SERVICE_KEY` - Platform service key (server-side only)
//! - `PAYMENT_WEBHOOK_SECRET` - Shared secret for webhook signatures
//!
//! ## Optional
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3000)
//! - `PLATFORM_API_VERSION` - Platform API version (default: v1)
//! - `CART_TTL_MINUTES` - Soft cart expiration window (default: 30)
//! - `PRICE_DRIFT_TOLERANCE` - Accepted live/remembered price drift
//!   as a fraction (default: 0.05)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_WEBHOOK_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Checkout service configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the checkout service
    pub base_url: String,
    /// Commerce platform API configuration
    pub platform: PlatformConfig,
    /// Cart and pricing policy values
    pub policy: CheckoutPolicy,
    /// Shared secret for payment webhook signatures
    pub webhook_secret: SecretString,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Commerce platform API configuration.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct PlatformConfig {
    /// Base URL of the platform API (e.g. <https://api.example.dev>)
    pub url: String,
    /// Platform API version segment (e.g. v1)
    pub api_version: String,
    /// Service key used for server-side calls
    pub service_key: SecretString,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

/// Policy values governing cart revalidation.
///
/// The drift tolerance and expiration window shipped as hard-coded
/// constants in earlier revisions; they are configuration now so that
/// merchandising can tune them without a deploy.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutPolicy {
    /// How long a cart may sit open before submission is refused.
    pub cart_ttl: Duration,
    /// Accepted |live - remembered| / live price drift, as a fraction.
    pub price_drift_tolerance: Decimal,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            cart_ttl: Duration::minutes(30),
            price_drift_tolerance: Decimal::new(5, 2),
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("CHECKOUT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("CHECKOUT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CHECKOUT_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("CHECKOUT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CHECKOUT_BASE_URL".to_string(), e.to_string())
        })?;

        let platform = PlatformConfig::from_env()?;
        let policy = CheckoutPolicy::from_env()?;

        let webhook_secret = get_validated_secret("PAYMENT_WEBHOOK_SECRET")?;
        validate_webhook_secret(&webhook_secret, "PAYMENT_WEBHOOK_SECRET")?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            base_url,
            platform,
            policy,
            webhook_secret,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PlatformConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: get_required_env("PLATFORM_URL")?,
            api_version: get_env_or_default("PLATFORM_API_VERSION", "v1"),
            service_key: get_validated_secret("PLATFORM_SERVICE_KEY")?,
        })
    }
}

impl CheckoutPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let ttl_minutes = get_env_or_default("CART_TTL_MINUTES", "30")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CART_TTL_MINUTES".to_string(), e.to_string())
            })?;
        if ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        let tolerance_raw = get_env_or_default("PRICE_DRIFT_TOLERANCE", "0.05");
        let tolerance = Decimal::from_str(&tolerance_raw).map_err(|e| {
            ConfigError::InvalidEnvVar("PRICE_DRIFT_TOLERANCE".to_string(), e.to_string())
        })?;
        if tolerance < Decimal::ZERO || tolerance >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "PRICE_DRIFT_TOLERANCE".to_string(),
                "must be in [0, 1)".to_string(),
            ));
        }

        Ok(Self {
            cart_ttl: Duration::minutes(ttl_minutes),
            price_drift_tolerance: tolerance,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the webhook secret meets minimum length requirements.
fn validate_webhook_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_WEBHOOK_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_WEBHOOK_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.len() as f64;
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
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
