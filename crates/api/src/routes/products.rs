//! Product routes: catalog browsing, product management, image uploads and
//! admin statistics.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::{
    CategoryId, DEFAULT_LOW_STOCK_THRESHOLD, PageInfo, PageRequest, Price, ProductId, ProductSize,
    StockLevel,
};

use crate::db::images::NewProductImage;
use crate::db::products::{NewProduct, ProductFilter, ProductSort, ProductUpdate};
use crate::db::{CategoryRepository, ProductImageRepository, ProductRepository, StatsRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Product, ProductDetail, ProductImage, ProductStats};
use crate::services::{MediaClient, UploadedImage};
use crate::state::AppState;

use super::{optional_text, required_text};

const MAX_NAME_CHARS: usize = 255;
const MAX_BRAND_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_ALT_TEXT_CHARS: usize = 255;

/// Most images accepted in one upload request.
const MAX_IMAGES_PER_UPLOAD: usize = 10;

/// Request body limit for image uploads.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/admin/stats", get(product_stats))
        .route("/api/products/admin/low-stock", get(low_stock))
        .route(
            "/api/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route(
            "/api/products/{id}/images",
            post(upload_images).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

// =============================================================================
// API Types
// =============================================================================

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<CategoryId>,
    pub brand: Option<String>,
    /// Comma-separated size codes, e.g. `M,L`.
    pub sizes: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub min_rating: Option<f64>,
    pub search: Option<String>,
    /// `price`, `created_at`, `average_rating`, `total_sold` or `name`,
    /// optionally prefixed with `-` for descending order.
    pub ordering: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductListQuery {
    fn into_parts(self) -> Result<(ProductFilter, ProductSort, PageRequest)> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::Validation(
                "min_price cannot be greater than max_price".to_string(),
            ));
        }
        if let Some(rating) = self.min_rating
            && !(0.0..=5.0).contains(&rating)
        {
            return Err(AppError::Validation(
                "min_rating must be between 0 and 5".to_string(),
            ));
        }

        let sizes = match self.sizes.as_deref().map(str::trim) {
            Some(list) if !list.is_empty() => {
                let codes: Vec<&str> = list.split(',').map(str::trim).collect();
                ProductSize::parse_list(&codes)?
            }
            _ => Vec::new(),
        };

        let sort = match self.ordering.as_deref().map(str::trim) {
            Some(ordering) if !ordering.is_empty() => {
                ordering.parse::<ProductSort>().map_err(AppError::Validation)?
            }
            _ => ProductSort::default(),
        };

        let filter = ProductFilter {
            category: self.category,
            brand: self.brand,
            sizes,
            min_price: self.min_price,
            max_price: self.max_price,
            in_stock: self.in_stock,
            min_rating: self.min_rating,
            search: self.search,
        };

        Ok((filter, sort, PageRequest::new(self.page, self.limit)))
    }
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub results: Vec<Product>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub total_qty: i32,
    #[serde(default)]
    pub total_sold: i32,
    pub low_stock_threshold: Option<i32>,
}

impl CreateProductRequest {
    /// Validate everything that doesn't need the database.
    fn validate(self) -> Result<NewProduct> {
        Ok(NewProduct {
            name: required_text("name", &self.name, MAX_NAME_CHARS)?,
            description: required_text("description", &self.description, MAX_DESCRIPTION_CHARS)?,
            brand: required_text("brand", &self.brand, MAX_BRAND_CHARS)?,
            category_id: self.category_id,
            sizes: ProductSize::parse_list(&self.sizes)?,
            price: Price::new(self.price)?,
            stock: StockLevel::new(
                self.total_qty,
                self.total_sold,
                self.low_stock_threshold
                    .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            )?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sizes: Option<Vec<String>>,
    pub price: Option<Decimal>,
    pub total_qty: Option<i32>,
    pub total_sold: Option<i32>,
    pub low_stock_threshold: Option<i32>,
}

impl UpdateProductRequest {
    /// Validate the changes, merging stock counters with `current` so the
    /// stored row stays consistent.
    fn validate(self, current: &Product) -> Result<ProductUpdate> {
        let stock_changed = self.total_qty.is_some()
            || self.total_sold.is_some()
            || self.low_stock_threshold.is_some();
        let stock = if stock_changed {
            Some(StockLevel::new(
                self.total_qty.unwrap_or(current.total_qty),
                self.total_sold.unwrap_or(current.total_sold),
                self.low_stock_threshold
                    .unwrap_or(current.low_stock_threshold),
            )?)
        } else {
            None
        };

        Ok(ProductUpdate {
            name: optional_text("name", self.name.as_deref(), MAX_NAME_CHARS)?,
            description: optional_text(
                "description",
                self.description.as_deref(),
                MAX_DESCRIPTION_CHARS,
            )?,
            brand: optional_text("brand", self.brand.as_deref(), MAX_BRAND_CHARS)?,
            category_id: self.category_id,
            sizes: self
                .sizes
                .as_deref()
                .map(ProductSize::parse_list)
                .transpose()?,
            price: self.price.map(Price::new).transpose()?,
            stock,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub message: String,
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct LowStockResponse {
    pub count: usize,
    pub products: Vec<Product>,
}

/// A file read from the upload form, not yet sent to the media service.
struct PendingImage {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Public product listing with filters, ordering and pagination.
///
/// GET /api/products
#[instrument(skip(state))]
async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<Json<ProductListResponse>> {
    let (filter, sort, page) = query.into_parts()?;
    let (results, total) = ProductRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;

    Ok(Json(ProductListResponse {
        results,
        pagination: page.info(total),
    }))
}

/// Public product detail with owner, images and reviews.
///
/// GET /api/products/{id}
#[instrument(skip(state))]
async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductDetail>> {
    ProductRepository::new(state.pool())
        .get_detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Create a product owned by the calling admin.
///
/// POST /api/products
#[instrument(skip(state, admin, req))]
async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(req): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = req.validate()?;
    ensure_category_exists(&state, product.category_id).await?;

    let product = ProductRepository::new(state.pool())
        .create(product, admin.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully",
            product,
        }),
    ))
}

/// Update a product. Owner or admin.
///
/// PATCH /api/products/{id}
#[instrument(skip(state, user, req))]
async fn update_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(req): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductResponse>> {
    let repo = ProductRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    user.ensure_can_modify(current.owner_id)?;

    let update = req.validate(&current)?;
    if let Some(category_id) = update.category_id {
        ensure_category_exists(&state, category_id).await?;
    }

    let product = repo.update(id, update).await?;

    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product,
    }))
}

/// Delete a product and its images, reviews and wishlist entries. Owner or admin.
///
/// DELETE /api/products/{id}
#[instrument(skip(state, user))]
async fn delete_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    let repo = ProductRepository::new(state.pool());
    let owner = repo
        .owner_of(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    user.ensure_can_modify(owner)?;

    let image_ids = repo.delete(id).await?;
    if let Some(media) = state.media() {
        media.destroy_all(&image_ids).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_category_exists(state: &AppState, id: CategoryId) -> Result<()> {
    if CategoryRepository::new(state.pool()).exists(id).await? {
        Ok(())
    } else {
        Err(AppError::Validation("Category does not exist".to_string()))
    }
}

// =============================================================================
// Images
// =============================================================================

/// Upload one or more images for a product. Owner or admin.
///
/// Multipart fields: `images` (repeatable file), `is_primary` (optional
/// flag) and `alt_text` (optional, applied to every image).
///
/// POST /api/products/{id}/images
#[instrument(skip(state, user, multipart))]
async fn upload_images(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ImageUploadResponse>)> {
    let owner = ProductRepository::new(state.pool())
        .owner_of(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    user.ensure_can_modify(owner)?;

    let media = state
        .media()
        .ok_or_else(|| AppError::ServiceUnavailable("Image uploads are not configured".to_string()))?;

    let mut multipart = multipart.map_err(|e| AppError::Validation(e.body_text()))?;
    let (pending, make_primary, alt_text) = read_upload_form(&mut multipart).await?;
    if pending.is_empty() {
        return Err(AppError::Validation("No images provided".to_string()));
    }

    let uploaded = upload_all(media, pending).await?;
    let new_images = uploaded
        .iter()
        .map(|image| NewProductImage {
            image_url: image.url.clone(),
            public_id: image.public_id.clone(),
            alt_text: alt_text.clone(),
        })
        .collect();

    let images = match ProductImageRepository::new(state.pool())
        .add_images(id, new_images, make_primary)
        .await
    {
        Ok(images) => images,
        Err(e) => {
            // The rows were never written, so the remote copies are orphans
            let public_ids: Vec<String> = uploaded.into_iter().map(|i| i.public_id).collect();
            media.destroy_all(&public_ids).await;
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse {
            message: format!("{} images uploaded successfully", images.len()),
            images,
        }),
    ))
}

async fn read_upload_form(
    multipart: &mut Multipart,
) -> Result<(Vec<PendingImage>, bool, String)> {
    let mut pending = Vec::new();
    let mut make_primary = false;
    let mut alt_text = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "images" | "image" => {
                if pending.len() >= MAX_IMAGES_PER_UPLOAD {
                    return Err(AppError::Validation(format!(
                        "At most {MAX_IMAGES_PER_UPLOAD} images can be uploaded at once"
                    )));
                }
                let content_type = field.content_type().map(str::to_owned);
                if let Some(ct) = content_type.as_deref()
                    && !ct.starts_with("image/")
                {
                    return Err(AppError::Validation(format!(
                        "Unsupported file type: {ct}"
                    )));
                }
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.is_empty() {
                    continue;
                }
                pending.push(PendingImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "is_primary" => {
                let value = field.text().await.map_err(multipart_error)?;
                make_primary = parse_flag(&value);
            }
            "alt_text" => {
                let value = field.text().await.map_err(multipart_error)?;
                alt_text = value.trim().chars().take(MAX_ALT_TEXT_CHARS).collect();
            }
            _ => {}
        }
    }

    Ok((pending, make_primary, alt_text))
}

/// Send every file to the media service. If one fails, the ones already
/// stored are removed again.
async fn upload_all(media: &MediaClient, pending: Vec<PendingImage>) -> Result<Vec<UploadedImage>> {
    let mut uploaded = Vec::with_capacity(pending.len());
    for image in pending {
        match media
            .upload(&image.file_name, image.content_type.as_deref(), image.bytes)
            .await
        {
            Ok(stored) => uploaded.push(stored),
            Err(e) => {
                let public_ids: Vec<String> =
                    uploaded.into_iter().map(|i: UploadedImage| i.public_id).collect();
                media.destroy_all(&public_ids).await;
                return Err(e.into());
            }
        }
    }
    Ok(uploaded)
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(e.body_text())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

// =============================================================================
// Admin Statistics
// =============================================================================

/// GET /api/products/admin/stats
#[instrument(skip_all)]
async fn product_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<ProductStats>> {
    let stats = StatsRepository::new(state.pool()).product_stats().await?;
    Ok(Json(stats))
}

/// Products running low. Without `threshold`, each product's own
/// low-stock threshold applies.
///
/// GET /api/products/admin/low-stock
#[instrument(skip(state, _admin))]
async fn low_stock(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<LowStockQuery>,
) -> Result<Json<LowStockResponse>> {
    if query.threshold.is_some_and(|t| t < 0) {
        return Err(AppError::Validation(
            "threshold cannot be negative".to_string(),
        ));
    }

    let products = StatsRepository::new(state.pool())
        .low_stock(query.threshold)
        .await?;

    Ok(Json(LowStockResponse {
        count: products.len(),
        products,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use mart_africa_core::UserId;

    use super::*;
    use crate::models::catalog::CategoryRef;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn create_request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Ankara Dress".to_string(),
            description: "Wax print cotton".to_string(),
            brand: "Lagos Loom".to_string(),
            category_id: CategoryId::new(1),
            sizes: vec!["M".to_string(), "S".to_string(), "M".to_string()],
            price: dec("59.90"),
            total_qty: 20,
            total_sold: 0,
            low_stock_threshold: None,
        }
    }

    fn stored_product() -> Product {
        Product {
            id: ProductId::new(3),
            name: "Ankara Dress".to_string(),
            description: "Wax print cotton".to_string(),
            brand: "Lagos Loom".to_string(),
            category: CategoryRef {
                id: CategoryId::new(1),
                name: "Dresses".to_string(),
            },
            owner_id: UserId::new(1),
            sizes: vec![ProductSize::Small],
            price: dec("59.90"),
            total_qty: 20,
            total_sold: 15,
            low_stock_threshold: 5,
            qty_left: 5,
            is_in_stock: true,
            is_low_stock: true,
            total_reviews: 0,
            average_rating: 0.0,
            primary_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_request_validates() {
        let product = create_request().validate().unwrap();
        assert_eq!(product.sizes, vec![ProductSize::Small, ProductSize::Medium]);
        assert_eq!(product.stock.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(product.stock.qty_left(), 20);
    }

    #[test]
    fn test_create_request_rejects_bad_values() {
        let mut req = create_request();
        req.price = dec("0");
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = create_request();
        req.total_sold = 21;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = create_request();
        req.sizes = vec!["XXXL".to_string()];
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = create_request();
        req.brand = "  ".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_merges_stock_with_current_counters() {
        let req = UpdateProductRequest {
            total_qty: Some(30),
            ..UpdateProductRequest::default()
        };
        let update = req.validate(&stored_product()).unwrap();
        let stock = update.stock.unwrap();
        assert_eq!((stock.total_qty, stock.total_sold), (30, 15));
    }

    #[test]
    fn test_update_rejects_oversold_merge() {
        let req = UpdateProductRequest {
            total_qty: Some(10),
            ..UpdateProductRequest::default()
        };
        assert!(matches!(
            req.validate(&stored_product()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_update_without_stock_fields_leaves_stock_alone() {
        let req = UpdateProductRequest {
            name: Some("Ankara Maxi".to_string()),
            ..UpdateProductRequest::default()
        };
        let update = req.validate(&stored_product()).unwrap();
        assert!(update.stock.is_none());
        assert_eq!(update.name.as_deref(), Some("Ankara Maxi"));
    }

    #[test]
    fn test_list_query_parsing() {
        let query = ProductListQuery {
            sizes: Some("L, m".to_string()),
            ordering: Some("-price".to_string()),
            limit: Some(500),
            ..ProductListQuery::default()
        };
        let (filter, sort, page) = query.into_parts().unwrap();
        assert_eq!(filter.sizes, vec![ProductSize::Medium, ProductSize::Large]);
        assert_eq!(sort, ProductSort::PriceDesc);
        assert_eq!(page.limit(), PageRequest::MAX_LIMIT);
    }

    #[test]
    fn test_list_query_rejects_inverted_price_range() {
        let query = ProductListQuery {
            min_price: Some(dec("100")),
            max_price: Some(dec("10")),
            ..ProductListQuery::default()
        };
        assert!(query.into_parts().is_err());
    }

    #[test]
    fn test_list_query_rejects_unknown_ordering() {
        let query = ProductListQuery {
            ordering: Some("popularity".to_string()),
            ..ProductListQuery::default()
        };
        assert!(matches!(query.into_parts(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" On "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
