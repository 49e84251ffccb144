//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::{Review, UserSummary};

const REVIEW_SELECT: &str = "SELECT r.id, r.product_id, r.user_id, u.fullname AS user_fullname, \
        r.rating, r.comment, r.created_at, r.updated_at \
     FROM mart.review r JOIN mart.user u ON u.id = r.user_id";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    user_fullname: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;

        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user: UserSummary {
                id: UserId::new(row.user_id),
                fullname: row.user_fullname,
            },
            rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for review operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a user's review of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the user already reviewed it.
    #[instrument(skip(self, comment))]
    pub async fn create(
        &self,
        product_id: ProductId,
        user_id: UserId,
        rating: Rating,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO mart.review (product_id, user_id, rating, comment) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(i16::from(rating))
        .bind(comment)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict("you have already reviewed this product".to_owned())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        tracing::info!(review_id = id, product_id = %product_id, "Review created");
        row.try_into()
    }
}
