//! Catalog models: categories, products, images and wishlist entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use mart_africa_core::{
    CategoryId, ProductId, ProductImageId, ProductSize, StockLevel, UserId, WishlistItemId,
    average_rating,
};

use super::review::Review;
use super::user::UserSummary;

/// A product category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub products_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category reference embedded in product payloads.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// A catalog product with its derived stock and rating fields.
///
/// `qty_left`, `is_in_stock`, `is_low_stock`, `total_reviews` and
/// `average_rating` are computed when the product is read and are never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: CategoryRef,
    pub owner_id: UserId,
    pub sizes: Vec<ProductSize>,
    pub price: Decimal,
    pub total_qty: i32,
    pub total_sold: i32,
    pub low_stock_threshold: i32,
    pub qty_left: i32,
    pub is_in_stock: bool,
    pub is_low_stock: bool,
    pub total_reviews: i64,
    pub average_rating: f64,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored product columns before the virtual fields are derived.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: CategoryRef,
    pub owner_id: UserId,
    pub sizes: Vec<ProductSize>,
    pub price: Decimal,
    pub stock: StockLevel,
    pub review_count: i64,
    pub rating_total: i64,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRecord> for Product {
    fn from(r: ProductRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            brand: r.brand,
            category: r.category,
            owner_id: r.owner_id,
            sizes: r.sizes,
            price: r.price,
            total_qty: r.stock.total_qty,
            total_sold: r.stock.total_sold,
            low_stock_threshold: r.stock.low_stock_threshold,
            qty_left: r.stock.qty_left(),
            is_in_stock: r.stock.is_in_stock(),
            is_low_stock: r.stock.is_low_stock(),
            total_reviews: r.review_count,
            average_rating: average_rating(r.rating_total, r.review_count),
            primary_image: r.primary_image,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// A product image hosted on the media service.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image_url: String,
    /// Media service identifier, needed to destroy the remote asset.
    #[serde(skip)]
    pub public_id: String,
    pub alt_text: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Full product view with owner, images and reviews.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub owner: UserSummary,
    pub images: Vec<ProductImage>,
    pub reviews: Vec<Review>,
}

/// A wishlist entry with the product it points at.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product: Product,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(total_qty: i32, total_sold: i32, review_count: i64, rating_total: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(1),
            name: "Ankara Shirt".to_string(),
            description: "Cotton print shirt".to_string(),
            brand: "Lagos Looms".to_string(),
            category: CategoryRef {
                id: CategoryId::new(1),
                name: "Shirts".to_string(),
            },
            owner_id: UserId::new(1),
            sizes: vec![ProductSize::Medium],
            price: Decimal::new(2500, 2),
            stock: StockLevel::new(total_qty, total_sold, 5).unwrap(),
            review_count,
            rating_total,
            primary_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_virtual_fields_derived_from_counters() {
        let product = Product::from(record(20, 8, 3, 13));
        assert_eq!(product.qty_left, 12);
        assert!(product.is_in_stock);
        assert!(!product.is_low_stock);
        assert_eq!(product.total_reviews, 3);
        assert!((product.average_rating - 4.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sold_out_product_without_reviews() {
        let product = Product::from(record(4, 4, 0, 0));
        assert_eq!(product.qty_left, 0);
        assert!(!product.is_in_stock);
        assert!(product.is_low_stock);
        assert!((product.average_rating - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialized_price_is_a_string() {
        let json = serde_json::to_value(Product::from(record(1, 0, 0, 0))).unwrap();
        assert_eq!(json["price"], "25.00");
        assert_eq!(json["sizes"][0], "M");
    }
}
