//! Settings persistence.
//!
//! # Database
//!
//! ## Tables
//!
//! - `showcase.settings` - Scalar key/value settings (shop domain, OAuth
//!   credentials, access token, API version, cache duration, UTM parameters)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/showcase/migrations/` and run via:
//! ```bash
//! cargo run -p products-showcase-cli -- migrate
//! ```
//!
//! When no database URL is configured the service falls back to
//! [`MemorySettingsStore`], which keeps settings for the life of the process.

pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use settings::{
    ApiCredentials, AppCredentials, CACHE_DURATION_CHOICES, DEFAULT_CACHE_DURATION_SECS,
    MemorySettingsStore, PgSettingsStore, SettingKey, Settings, SettingsSnapshot, SettingsStore,
    UtmParams,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A value was rejected before being stored.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
