//! CLI command implementations.

pub mod migrate;
pub mod settings;

use products_showcase::config::ConfigError;
use products_showcase::db::RepositoryError;
use products_showcase::shopify::ShopifyError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: SHOWCASE_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Refusing to reset without --yes")]
    NotConfirmed,
}

/// Connect to the settings database named by the environment.
pub async fn connect() -> Result<PgPool, CommandError> {
    let _ = dotenvy::dotenv();

    let url = ["SHOWCASE_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
        .ok_or(CommandError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(products_showcase::db::create_pool(&SecretString::from(url)).await?)
}
