//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Dresses
//!     description: Ankara and kente cuts
//! products:
//!   - name: Ankara Maxi Dress
//!     brand: Lagos Loom
//!     category: Dresses
//!     sizes: [S, M, L]
//!     price: "59.90"
//!     total_qty: 20
//! ```
//!
//! Products reference categories by name. A category missing from the file
//! is looked up in the database before the file is rejected.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use mart_africa_api::db::products::NewProduct;
use mart_africa_api::db::{CategoryRepository, ProductRepository, RepositoryError, UserRepository};
use mart_africa_core::{
    CategoryId, DEFAULT_LOW_STOCK_THRESHOLD, Email, EmailError, Price, ProductSize, StockLevel,
};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Invalid owner email: {0}")]
    InvalidOwner(#[from] EmailError),

    #[error("Owner {0} does not exist or is not an admin")]
    OwnerNotAdmin(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub price: Decimal,
    pub total_qty: i32,
    #[serde(default)]
    pub total_sold: i32,
    pub low_stock_threshold: Option<i32>,
}

/// A product ready to insert once its category name is resolved.
#[derive(Debug)]
struct PreparedProduct {
    category: String,
    product: NewProduct,
}

/// Check every product and collect all problems rather than stopping at
/// the first.
fn prepare(file: &CatalogFile) -> (Vec<PreparedProduct>, Vec<String>) {
    let mut prepared = Vec::with_capacity(file.products.len());
    let mut errors = Vec::new();

    for (index, category) in file.categories.iter().enumerate() {
        if category.name.trim().is_empty() {
            errors.push(format!("categories[{index}]: name is required"));
        }
    }

    for (index, seed) in file.products.iter().enumerate() {
        let label = format!("products[{index}] ({})", seed.name);
        let name = seed.name.trim();
        if name.is_empty() {
            errors.push(format!("products[{index}]: name is required"));
            continue;
        }

        let sizes = match ProductSize::parse_list(&seed.sizes) {
            Ok(sizes) => sizes,
            Err(e) => {
                errors.push(format!("{label}: {e}"));
                continue;
            }
        };
        let price = match Price::new(seed.price) {
            Ok(price) => price,
            Err(e) => {
                errors.push(format!("{label}: {e}"));
                continue;
            }
        };
        let stock = match StockLevel::new(
            seed.total_qty,
            seed.total_sold,
            seed.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        ) {
            Ok(stock) => stock,
            Err(e) => {
                errors.push(format!("{label}: {e}"));
                continue;
            }
        };

        prepared.push(PreparedProduct {
            category: seed.category.trim().to_owned(),
            product: NewProduct {
                name: name.to_owned(),
                description: seed.description.trim().to_owned(),
                brand: seed.brand.trim().to_owned(),
                // Resolved against the database before insert.
                category_id: CategoryId::new(0),
                sizes,
                price,
                stock,
            },
        });
    }

    (prepared, errors)
}

/// Seed categories and products from `file_path`, owned by the admin
/// with email `owner`.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the owner is not
/// an admin, a category can't be resolved, or the database fails.
pub async fn catalog(file_path: &str, owner: &str) -> Result<(), SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: file_path.to_owned(),
            source,
        })?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    let owner_email = Email::parse(owner)?;

    let (prepared, errors) = prepare(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }
    info!(
        categories = file.categories.len(),
        products = prepared.len(),
        "Catalog validated"
    );

    let pool = connect().await?;

    let owner = UserRepository::new(&pool)
        .get_by_email(&owner_email)
        .await?
        .filter(|user| user.is_admin)
        .ok_or_else(|| SeedError::OwnerNotAdmin(owner_email.to_string()))?;

    let categories = CategoryRepository::new(&pool);
    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    let mut categories_created = 0_usize;

    for seed in &file.categories {
        let name = seed.name.trim();
        let category = match categories.get_by_name(name).await? {
            Some(existing) => existing,
            None => {
                categories_created += 1;
                categories.create(name, seed.description.trim()).await?
            }
        };
        category_ids.insert(name.to_owned(), category.id);
    }

    let products = ProductRepository::new(&pool);
    for PreparedProduct {
        category,
        mut product,
    } in prepared
    {
        let category_id = match category_ids.get(&category) {
            Some(id) => *id,
            None => {
                let found = categories
                    .get_by_name(&category)
                    .await?
                    .ok_or_else(|| SeedError::UnknownCategory(category.clone()))?;
                category_ids.insert(category.clone(), found.id);
                found.id
            }
        };
        product.category_id = category_id;
        products.create(product, owner.id).await?;
    }

    info!("Seeding complete!");
    info!("  Categories created: {categories_created}");
    info!("  Categories reused: {}", file.categories.len() - categories_created);
    info!("  Products inserted: {}", file.products.len());

    Ok(())
}
