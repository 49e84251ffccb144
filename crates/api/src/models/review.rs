//! Product reviews.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mart_africa_core::{ProductId, Rating, ReviewId};

use super::user::UserSummary;

/// A review left by a user on a product.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user: UserSummary,
    pub rating: Rating,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
