//! Category repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::CategoryId;

use super::{RepositoryError, conflict_on_unique, contains_pattern};
use crate::models::Category;

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.description, c.created_at, c.updated_at, \
        (SELECT COUNT(*) FROM mart.product p WHERE p.category_id = c.id) AS products_count \
     FROM mart.category c";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    description: String,
    products_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
            products_count: row.products_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for category operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories by name, optionally filtered by a name/description search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Category>, RepositoryError> {
        let rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query_as::<_, CategoryRow>(&format!(
                    "{CATEGORY_SELECT} WHERE c.name ILIKE $1 OR c.description ILIKE $1 \
                     ORDER BY c.name"
                ))
                .bind(contains_pattern(term))
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CategoryRow>(&format!("{CATEGORY_SELECT} ORDER BY c.name"))
                    .fetch_all(self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!("{CATEGORY_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Whether a category exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM mart.category WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Get a category by exact name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row =
            sqlx::query_as::<_, CategoryRow>(&format!("{CATEGORY_SELECT} WHERE c.name = $1"))
                .bind(name)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    #[instrument(skip(self, description))]
    pub async fn create(&self, name: &str, description: &str) -> Result<Category, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO mart.category (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a category with this name already exists"))?;

        self.get(CategoryId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Partially update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let result = sqlx::query(
            "UPDATE mart.category SET name = COALESCE($2, name), \
                description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a category with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an empty category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if products still reference it.
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let in_use = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM mart.product WHERE category_id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "category still has {in_use} product(s)"
            )));
        }

        let result = sqlx::query("DELETE FROM mart.category WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                // A product was added since the count above
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::Conflict("category still has products".to_owned())
                }
                other => RepositoryError::Database(other),
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
