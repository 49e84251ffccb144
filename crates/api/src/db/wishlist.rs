//! Wishlist repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use super::products::{PRODUCT_COLUMNS, PRODUCT_JOINS, ProductRow};
use crate::models::WishlistItem;

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    wishlist_id: i32,
    added_at: DateTime<Utc>,
    #[sqlx(flatten)]
    product: ProductRow,
}

impl TryFrom<WishlistRow> for WishlistItem {
    type Error = RepositoryError;

    fn try_from(row: WishlistRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: WishlistItemId::new(row.wishlist_id),
            product: row.product.try_into()?,
            created_at: row.added_at,
        })
    }
}

fn wishlist_select() -> String {
    format!(
        "SELECT w.id AS wishlist_id, w.created_at AS added_at, {PRODUCT_COLUMNS} \
         FROM mart.wishlist_item w \
         JOIN mart.product p ON p.id = w.product_id {PRODUCT_JOINS}"
    )
}

/// Repository for wishlist operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's wishlist, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(&format!(
            "{} WHERE w.user_id = $1 ORDER BY w.created_at DESC, w.id DESC",
            wishlist_select()
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Add a product to the user's wishlist.
    ///
    /// Adding a product twice is a no-op that returns the existing entry.
    /// The flag is `true` only when a new entry was created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(WishlistItem, bool), RepositoryError> {
        let inserted = sqlx::query_scalar::<_, i32>(
            "INSERT INTO mart.wishlist_item (user_id, product_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, product_id) DO NOTHING RETURNING id",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::NotFound
            }
            other => RepositoryError::Database(other),
        })?;

        let row = sqlx::query_as::<_, WishlistRow>(&format!(
            "{} WHERE w.user_id = $1 AND w.product_id = $2",
            wishlist_select()
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok((row.try_into()?, inserted.is_some()))
    }

    /// Remove one of the user's entries by entry ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such entry belongs to the user.
    pub async fn remove_by_id(
        &self,
        user_id: UserId,
        id: WishlistItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM mart.wishlist_item WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a product from the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product isn't on the list.
    pub async fn remove_by_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM mart.wishlist_item WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of entries on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM mart.wishlist_item WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
