//! Database operations for the Mart Africa `PostgreSQL` store.
//!
//! # Schema: `mart`
//!
//! ## Tables
//!
//! - `user` - Accounts with the `is_admin` role flag
//! - `shipping_address` - At most one per user
//! - `revoked_token` - Refresh tokens invalidated by logout
//! - `category` - Product categories (unique name)
//! - `product` - Catalog entries with stock counters
//! - `product_image` - Media-hosted images, one primary per product
//! - `review` - One rating per user per product
//! - `wishlist_item` - Unique per (user, product)
//! - `customer_order` - Orders with JSON item and address snapshots
//!
//! Foreign keys never cascade. Deleting a user or product removes its
//! dependent rows explicitly inside the owning repository's transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p mart-africa-cli -- migrate
//! ```

pub mod addresses;
pub mod categories;
pub mod images;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stats;
pub mod tokens;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::ShippingAddressRepository;
pub use categories::CategoryRepository;
pub use images::ProductImageRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use stats::StatsRepository;
pub use tokens::RevokedTokenRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Escape `LIKE` wildcards in user input and wrap it for a substring match.
pub(crate) fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("shirt"), "%shirt%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_conflict_on_unique_passes_through_other_errors() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
