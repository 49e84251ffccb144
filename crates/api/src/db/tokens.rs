//! Revocation list for refresh tokens.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mart_africa_core::UserId;

use super::RepositoryError;

/// Repository for revoked refresh token ids.
pub struct RevokedTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RevokedTokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Revoke a token id. Revoking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn revoke(
        &self,
        jti: Uuid,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO mart.revoked_token (jti, user_id, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Whether a token id has been revoked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_revoked(&self, jti: Uuid) -> Result<bool, RepositoryError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM mart.revoked_token WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(self.pool)
        .await?;
        Ok(revoked)
    }

    /// Drop entries for tokens that have expired anyway.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM mart.revoked_token WHERE expires_at < NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
