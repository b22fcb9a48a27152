//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOWCASE_BASE_URL` - Public URL of this service (OAuth redirect target is derived from it)
//! - `SHOWCASE_ADMIN_TOKEN` - Bearer token granting admin capability (min 32 chars, high entropy)
//! - `SHOWCASE_EDITOR_TOKEN` - Bearer token granting editor capability (min 32 chars, high entropy)
//!
//! ## Optional
//! - `SHOWCASE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOWCASE_PORT` - Listen port (default: 3100)
//! - `SHOWCASE_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string; settings
//!   are kept in memory when neither is set
//! - `SHOPIFY_API_VERSION_FALLBACK` - API version used before detection (default: 2025-10)
//! - `SHOPIFY_API_ORIGIN` - Override for `https://{shop}` when calling Shopify
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use products_showcase_core::{ApiVersion, FALLBACK_API_VERSION};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_LENGTH: usize = 32;
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

/// Showcase service configuration.
#[derive(Debug, Clone)]
pub struct ShowcaseConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// `PostgreSQL` connection URL; `None` keeps settings in memory
    pub database_url: Option<SecretString>,
    /// Token granting admin capability
    pub admin_token: SecretString,
    /// Token granting editor capability
    pub editor_token: SecretString,
    /// Shopify API configuration
    pub shopify: ShopifyConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Admin API configuration that does not live in the settings store.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Version used when no detected version is stored
    pub api_version_fallback: ApiVersion,
    /// Replaces `https://{shop}` as the API origin when set
    pub api_origin: Option<String>,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            api_version_fallback: ApiVersion::fallback(),
            api_origin: None,
        }
    }
}

impl ShowcaseConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if tokens fail validation (placeholder detection, entropy, length).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("SHOWCASE_HOST", "127.0.0.1")?;
        let port = parse_env("SHOWCASE_PORT", "3100")?;
        let base_url = get_required_env("SHOWCASE_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let database_url = get_database_url("SHOWCASE_DATABASE_URL");

        let admin_token = get_validated_token("SHOWCASE_ADMIN_TOKEN")?;
        let editor_token = get_validated_token("SHOWCASE_EDITOR_TOKEN")?;
        if admin_token.expose_secret() == editor_token.expose_secret() {
            return Err(ConfigError::InsecureSecret(
                "SHOWCASE_EDITOR_TOKEN".to_string(),
                "must differ from SHOWCASE_ADMIN_TOKEN".to_string(),
            ));
        }

        let shopify = ShopifyConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            database_url,
            admin_token,
            editor_token,
            shopify,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The OAuth redirect URI registered with the Shopify app.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}/oauth/callback", self.base_url)
    }
}

impl ShopifyConfig {
    /// Load the Shopify section on its own, for tools that need no server settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for a malformed fallback version.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = get_env_or_default("SHOPIFY_API_VERSION_FALLBACK", FALLBACK_API_VERSION);
        let api_version_fallback = ApiVersion::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPIFY_API_VERSION_FALLBACK".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_version_fallback,
            api_origin: get_optional_env("SHOPIFY_API_ORIGIN")
                .map(|origin| origin.trim_end_matches('/').to_string()),
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

/// Database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a token meets minimum length requirements.
fn validate_token_length(token: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = token.expose_secret();
    if value.len() < MIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_LENGTH,
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
            #[allow(clippy::cast_precision_loss)]
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

/// Load and validate an access token from environment.
fn get_validated_token(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    let token = SecretString::from(value);
    validate_token_length(&token, key)?;
    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_config() -> ShowcaseConfig {
        ShowcaseConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3100,
            base_url: "https://showcase.test".to_string(),
            database_url: None,
            admin_token: SecretString::from("admin-token-value-q8Zr4kLm2Xv9Tp"),
            editor_token: SecretString::from("editor-token-value-H3nW7cYb5Ja1Ds"),
            shopify: ShopifyConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-admin-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_token_length() {
        assert!(validate_token_length(&SecretString::from("short"), "T").is_err());
        assert!(validate_token_length(&SecretString::from("a".repeat(32)), "T").is_ok());
    }

    #[test]
    fn test_socket_addr_and_redirect_uri() {
        let config = sample_config();
        assert_eq!(config.socket_addr().port(), 3100);
        assert_eq!(config.redirect_uri(), "https://showcase.test/oauth/callback");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", sample_config());
        assert!(debug_output.contains("https://showcase.test"));
        assert!(!debug_output.contains("admin-token-value"));
        assert!(!debug_output.contains("editor-token-value"));
    }

    #[test]
    fn test_default_fallback_version() {
        assert_eq!(
            ShopifyConfig::default().api_version_fallback.as_str(),
            FALLBACK_API_VERSION
        );
    }
}
