//! Product image repository.
//!
//! A product has at most one primary image; a partial unique index backs
//! this, and [`ProductImageRepository::add_images`] demotes the old primary
//! in the same transaction that promotes a new one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{ProductId, ProductImageId};

use super::RepositoryError;
use crate::models::ProductImage;

const IMAGE_COLUMNS: &str = "id, product_id, image_url, public_id, alt_text, is_primary, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductImageRow {
    id: i32,
    product_id: i32,
    image_url: String,
    public_id: String,
    alt_text: String,
    is_primary: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductImageRow> for ProductImage {
    fn from(row: ProductImageRow) -> Self {
        Self {
            id: ProductImageId::new(row.id),
            product_id: ProductId::new(row.product_id),
            image_url: row.image_url,
            public_id: row.public_id,
            alt_text: row.alt_text,
            is_primary: row.is_primary,
            created_at: row.created_at,
        }
    }
}

/// An uploaded image to attach to a product.
#[derive(Debug, Clone)]
pub struct NewProductImage {
    pub image_url: String,
    pub public_id: String,
    pub alt_text: String,
}

/// Repository for product image operations.
pub struct ProductImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Images for a product, primary first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductImageRow>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM mart.product_image WHERE product_id = $1 \
             ORDER BY is_primary DESC, created_at, id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach images to a product.
    ///
    /// The first new image becomes primary when `make_primary` is set or
    /// the product has no primary image yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    #[instrument(skip(self, images), fields(count = images.len()))]
    pub async fn add_images(
        &self,
        product_id: ProductId,
        images: Vec<NewProductImage>,
        make_primary: bool,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the product so concurrent uploads agree on the primary
        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM mart.product WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let has_primary = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM mart.product_image \
             WHERE product_id = $1 AND is_primary)",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        let promote = make_primary || !has_primary;
        if promote && has_primary {
            sqlx::query(
                "UPDATE mart.product_image SET is_primary = FALSE \
                 WHERE product_id = $1 AND is_primary",
            )
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        let mut created = Vec::with_capacity(images.len());
        for (index, image) in images.into_iter().enumerate() {
            let row = sqlx::query_as::<_, ProductImageRow>(&format!(
                "INSERT INTO mart.product_image \
                    (product_id, image_url, public_id, alt_text, is_primary) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {IMAGE_COLUMNS}"
            ))
            .bind(product_id)
            .bind(&image.image_url)
            .bind(&image.public_id)
            .bind(&image.alt_text)
            .bind(promote && index == 0)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row.into());
        }

        sqlx::query("UPDATE mart.product SET updated_at = NOW() WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(product_id = %product_id, count = created.len(), "Images attached");

        Ok(created)
    }
}
