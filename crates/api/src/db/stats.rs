//! Read-only aggregate queries for dashboards and catalog statistics.

use sqlx::PgPool;
use tracing::instrument;

use super::products::{PRODUCT_COLUMNS, PRODUCT_JOINS, ProductRow};
use super::{RepositoryError, UserRepository};
use crate::models::{AdminDashboard, Product, ProductStats};

/// Number of entries in "recent" and "top" lists.
const HIGHLIGHT_LIMIT: i64 = 5;

/// Repository for aggregate statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// System-wide account counts and the newest accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, RepositoryError> {
        let (total_users, admin_users, users_with_shipping_address) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE is_admin), \
                    COUNT(*) FILTER (WHERE has_shipping_address) \
                 FROM mart.user",
            )
            .fetch_one(self.pool)
            .await?;

        let recent_users = UserRepository::new(self.pool)
            .list_recent(HIGHLIGHT_LIMIT)
            .await?;

        Ok(AdminDashboard {
            total_users,
            admin_users,
            regular_users: total_users - admin_users,
            users_with_shipping_address,
            recent_users,
        })
    }

    /// Catalog counts, best sellers and newest products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn product_stats(&self) -> Result<ProductStats, RepositoryError> {
        let (total_products, low_stock_products, out_of_stock_products) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE total_qty - total_sold <= low_stock_threshold), \
                    COUNT(*) FILTER (WHERE total_qty - total_sold <= 0) \
                 FROM mart.product",
            )
            .fetch_one(self.pool)
            .await?;

        let total_categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mart.category")
            .fetch_one(self.pool)
            .await?;

        let top_selling_products = self
            .products_ordered_by("p.total_sold DESC, p.id DESC")
            .await?;
        let recent_products = self
            .products_ordered_by("p.created_at DESC, p.id DESC")
            .await?;

        Ok(ProductStats {
            total_products,
            total_categories,
            low_stock_products,
            out_of_stock_products,
            top_selling_products,
            recent_products,
        })
    }

    /// Products with at most `threshold` units left, or at or below their
    /// own threshold when none is given. Fewest stocked first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn low_stock(&self, threshold: Option<i32>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM mart.product p {PRODUCT_JOINS} \
             WHERE p.total_qty - p.total_sold <= COALESCE($1, p.low_stock_threshold) \
             ORDER BY p.total_qty ASC, p.id"
        ))
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn products_ordered_by(&self, order_by: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM mart.product p {PRODUCT_JOINS} \
             ORDER BY {order_by} LIMIT $1"
        ))
        .bind(HIGHLIGHT_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
