//! Database migration command.
//!
//! Applies `crates/showcase/migrations/` to the database named by
//! `SHOWCASE_DATABASE_URL` (or `DATABASE_URL`). The server never migrates on
//! startup.

use super::{CommandError, connect};

/// Run pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../showcase/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
