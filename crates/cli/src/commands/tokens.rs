//! Refresh-token blocklist maintenance.

use mart_africa_api::db::{RepositoryError, RevokedTokenRepository};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Delete revoked tokens that would fail verification anyway.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn purge() -> Result<(), TokenError> {
    let pool = connect().await?;
    let removed = RevokedTokenRepository::new(&pool).purge_expired().await?;
    tracing::info!(removed, "Expired revoked tokens purged");
    Ok(())
}
