//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod tokens;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command that talks to the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither database variable is set.
    #[error("Missing environment variable: MART_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load `.env` and connect using `MART_DATABASE_URL`, falling back to
/// `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    let pool = mart_africa_api::db::create_pool(&database_url).await?;
    Ok(pool)
}
