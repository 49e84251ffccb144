//! Product repository.
//!
//! Listing queries are assembled with `QueryBuilder` so optional filters
//! bind only the parameters they use. Review counts and the primary image
//! are joined in, and the virtual stock/rating fields are derived in
//! [`Product::from`](crate::models::Product).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use mart_africa_core::{
    CategoryId, PageRequest, Price, ProductId, ProductSize, StockLevel, UserId,
};

use super::{
    ProductImageRepository, RepositoryError, ReviewRepository, UserRepository, contains_pattern,
};
use crate::models::catalog::{CategoryRef, ProductRecord};
use crate::models::{Product, ProductDetail, UserSummary};

/// Columns selected for every product read. Requires [`PRODUCT_JOINS`].
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.brand, \
    p.category_id, c.name AS category_name, p.owner_id, p.sizes, p.price, \
    p.total_qty, p.total_sold, p.low_stock_threshold, p.created_at, p.updated_at, \
    COALESCE(r.review_count, 0) AS review_count, \
    COALESCE(r.rating_total, 0) AS rating_total, \
    img.image_url AS primary_image";

/// Joins backing [`PRODUCT_COLUMNS`]; the product table must be aliased `p`.
pub(crate) const PRODUCT_JOINS: &str = "JOIN mart.category c ON c.id = p.category_id \
    LEFT JOIN ( \
        SELECT product_id, COUNT(*) AS review_count, SUM(rating)::BIGINT AS rating_total \
        FROM mart.review GROUP BY product_id \
    ) r ON r.product_id = p.id \
    LEFT JOIN LATERAL ( \
        SELECT i.image_url FROM mart.product_image i \
        WHERE i.product_id = p.id \
        ORDER BY i.is_primary DESC, i.created_at, i.id \
        LIMIT 1 \
    ) img ON TRUE";

/// Rounded the same way as the `average_rating` field, so filters and
/// ordering agree with the value clients see.
const AVERAGE_RATING_EXPR: &str =
    "COALESCE(ROUND(r.rating_total::numeric / NULLIF(r.review_count, 0), 1), 0)";

const QTY_LEFT_EXPR: &str = "(p.total_qty - p.total_sold)";

/// Internal row type for product reads.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: i32,
    name: String,
    description: String,
    brand: String,
    category_id: i32,
    category_name: String,
    owner_id: i32,
    sizes: Vec<String>,
    price: Decimal,
    total_qty: i32,
    total_sold: i32,
    low_stock_threshold: i32,
    review_count: i64,
    rating_total: i64,
    primary_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let sizes = ProductSize::parse_list(&row.sizes).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid size in database: {e}"))
        })?;
        let stock = StockLevel::new(row.total_qty, row.total_sold, row.low_stock_threshold)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid stock in database: {e}"))
            })?;

        Ok(ProductRecord {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            brand: row.brand,
            category: CategoryRef {
                id: CategoryId::new(row.category_id),
                name: row.category_name,
            },
            owner_id: UserId::new(row.owner_id),
            sizes,
            price: row.price,
            stock,
            review_count: row.review_count,
            rating_total: row.rating_total,
            primary_image: row.primary_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .into())
    }
}

/// Optional filters for product listings.
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    /// Case-insensitive substring match on brand.
    pub brand: Option<String>,
    /// Products offered in any of these sizes.
    pub sizes: Vec<ProductSize>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub min_rating: Option<f64>,
    /// Case-insensitive substring match on name, description or brand.
    pub search: Option<String>,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    CreatedAsc,
    #[default]
    CreatedDesc,
    RatingAsc,
    RatingDesc,
    SoldAsc,
    SoldDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    fn order_by(self) -> String {
        let clause = match self {
            Self::PriceAsc => "p.price ASC".to_string(),
            Self::PriceDesc => "p.price DESC".to_string(),
            Self::CreatedAsc => "p.created_at ASC".to_string(),
            Self::CreatedDesc => "p.created_at DESC".to_string(),
            Self::RatingAsc => format!("{AVERAGE_RATING_EXPR} ASC"),
            Self::RatingDesc => format!("{AVERAGE_RATING_EXPR} DESC"),
            Self::SoldAsc => "p.total_sold ASC".to_string(),
            Self::SoldDesc => "p.total_sold DESC".to_string(),
            Self::NameAsc => "p.name ASC".to_string(),
            Self::NameDesc => "p.name DESC".to_string(),
        };
        format!(" ORDER BY {clause}, p.id DESC")
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    /// Parse `field` or `-field` (descending).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "price" => Ok(Self::PriceAsc),
            "-price" => Ok(Self::PriceDesc),
            "created_at" => Ok(Self::CreatedAsc),
            "-created_at" => Ok(Self::CreatedDesc),
            "average_rating" => Ok(Self::RatingAsc),
            "-average_rating" => Ok(Self::RatingDesc),
            "total_sold" => Ok(Self::SoldAsc),
            "-total_sold" => Ok(Self::SoldDesc),
            "name" => Ok(Self::NameAsc),
            "-name" => Ok(Self::NameDesc),
            other => Err(format!(
                "invalid ordering '{other}'. Use price, created_at, average_rating, total_sold or name, optionally prefixed with '-'"
            )),
        }
    }
}

/// A validated product to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category_id: CategoryId,
    pub sizes: Vec<ProductSize>,
    pub price: Price,
    pub stock: StockLevel,
}

/// A validated partial update. Stock is passed whole once merged with the
/// stored counters, so `total_sold <= total_qty` is checked up front.
#[derive(Debug, Default, Clone)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sizes: Option<Vec<ProductSize>>,
    pub price: Option<Price>,
    pub stock: Option<StockLevel>,
}

fn size_codes(sizes: &[ProductSize]) -> Vec<String> {
    sizes.iter().map(|s| s.code().to_owned()).collect()
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");

    if let Some(category) = filter.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        qb.push(" AND p.brand ILIKE ")
            .push_bind(contains_pattern(brand));
    }
    if !filter.sizes.is_empty() {
        qb.push(" AND p.sizes && ")
            .push_bind(size_codes(&filter.sizes))
            .push("::text[]");
    }
    if let Some(min_price) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max_price);
    }
    match filter.in_stock {
        Some(true) => {
            qb.push(format!(" AND {QTY_LEFT_EXPR} > 0"));
        }
        Some(false) => {
            qb.push(format!(" AND {QTY_LEFT_EXPR} <= 0"));
        }
        None => {}
    }
    if let Some(min_rating) = filter.min_rating {
        qb.push(format!(" AND {AVERAGE_RATING_EXPR} >= "))
            .push_bind(min_rating);
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.brand ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Repository for product operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List one page of products matching `filter`, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count_qb =
            QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM mart.product p {PRODUCT_JOINS}"));
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM mart.product p {PRODUCT_JOINS}"
        ));
        push_filters(&mut qb, filter);
        qb.push(sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = qb.build_query_as::<ProductRow>().fetch_all(self.pool).await?;
        let products = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Product>, _>>()?;

        Ok((products, total))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM mart.product p {PRODUCT_JOINS} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a product with its owner, images and reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = self.get(id).await? else {
            return Ok(None);
        };

        let owner = UserRepository::new(self.pool)
            .get_by_id(product.owner_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("product {id} has no owner"))
            })?;
        let images = ProductImageRepository::new(self.pool).list_for_product(id).await?;
        let reviews = ReviewRepository::new(self.pool).list_for_product(id).await?;

        Ok(Some(ProductDetail {
            owner: UserSummary {
                id: owner.id,
                fullname: owner.fullname,
            },
            product,
            images,
            reviews,
        }))
    }

    /// Owner of a product, if the product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner_of(&self, id: ProductId) -> Result<Option<UserId>, RepositoryError> {
        let owner = sqlx::query_scalar::<_, UserId>("SELECT owner_id FROM mart.product WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(owner)
    }

    /// Whether a product exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM mart.product WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a product owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(
        &self,
        product: NewProduct,
        owner: UserId,
    ) -> Result<Product, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO mart.product \
                (name, description, brand, category_id, owner_id, sizes, price, \
                 total_qty, total_sold, low_stock_threshold) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.brand)
        .bind(product.category_id)
        .bind(owner)
        .bind(size_codes(&product.sizes))
        .bind(product.price.amount())
        .bind(product.stock.total_qty)
        .bind(product.stock.total_sold)
        .bind(product.stock.low_stock_threshold)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(product_id = %id, owner_id = %owner, "Product created");

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the stored stock check fails.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            "UPDATE mart.product SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                brand = COALESCE($4, brand), \
                category_id = COALESCE($5, category_id), \
                sizes = COALESCE($6, sizes), \
                price = COALESCE($7, price), \
                total_qty = COALESCE($8, total_qty), \
                total_sold = COALESCE($9, total_sold), \
                low_stock_threshold = COALESCE($10, low_stock_threshold), \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.description)
        .bind(update.brand)
        .bind(update.category_id)
        .bind(update.sizes.as_deref().map(size_codes))
        .bind(update.price.map(|p| p.amount()))
        .bind(update.stock.map(|s| s.total_qty))
        .bind(update.stock.map(|s| s.total_sold))
        .bind(update.stock.map(|s| s.low_stock_threshold))
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                RepositoryError::Conflict("total sold cannot exceed total quantity".to_owned())
            }
            other => RepositoryError::Database(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product with its images, reviews and wishlist entries.
    ///
    /// Returns the media public ids of the deleted images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let image_ids = sqlx::query_scalar::<_, String>(
            "DELETE FROM mart.product_image WHERE product_id = $1 RETURNING public_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        for statement in [
            "DELETE FROM mart.review WHERE product_id = $1",
            "DELETE FROM mart.wishlist_item WHERE product_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM mart.product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        tracing::info!(product_id = %id, images = image_ids.len(), "Product deleted");

        Ok(image_ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!("-price".parse::<ProductSort>().unwrap(), ProductSort::PriceDesc);
        assert_eq!(
            "average_rating".parse::<ProductSort>().unwrap(),
            ProductSort::RatingAsc
        );
        assert!("popularity".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_sort_always_breaks_ties_by_id() {
        assert_eq!(ProductSort::PriceAsc.order_by(), " ORDER BY p.price ASC, p.id DESC");
        assert!(ProductSort::RatingDesc.order_by().contains("NULLIF"));
    }

    #[test]
    fn test_rating_filter_uses_rounded_average() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM mart.product p");
        push_filters(
            &mut qb,
            &ProductFilter {
                min_rating: Some(4.3),
                ..ProductFilter::default()
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("ROUND(r.rating_total::numeric / NULLIF(r.review_count, 0), 1)"));
        assert!(sql.contains(">= $1"));
    }

    #[test]
    fn test_filters_bind_only_what_is_set() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM mart.product p");
        push_filters(&mut qb, &ProductFilter::default());
        assert_eq!(qb.sql(), "SELECT 1 FROM mart.product p WHERE TRUE");

        let filter = ProductFilter {
            category: Some(CategoryId::new(2)),
            sizes: vec![ProductSize::Medium, ProductSize::Large],
            in_stock: Some(true),
            search: Some("ankara".to_string()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM mart.product p");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("p.category_id = $1"));
        assert!(sql.contains("p.sizes && $2::text[]"));
        assert!(sql.contains("(p.total_qty - p.total_sold) > 0"));
        assert!(sql.contains("p.name ILIKE $3 OR p.description ILIKE $4 OR p.brand ILIKE $5"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            brand: Some(String::new()),
            ..ProductFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM mart.product p");
        push_filters(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT 1 FROM mart.product p WHERE TRUE");
    }
}
