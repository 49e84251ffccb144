//! Product review routes, mounted at `/api/{id}/reviews` and
//! `/api/products/{id}/reviews`.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::{ProductId, Rating};

use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::Review;
use crate::state::AppState;

const MAX_COMMENT_CHARS: usize = 2000;

/// Build the review router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/{id}/reviews", get(list_reviews).post(create_review))
        .route(
            "/api/products/{id}/reviews",
            get(list_reviews).post(create_review),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    /// Checked against `1..=5` after parsing so the error names the range.
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: &'static str,
    pub review: Review,
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_string())
}

/// Reviews of a product, newest first.
///
/// GET /api/{id}/reviews
#[instrument(skip(state))]
async fn list_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Vec<Review>>> {
    if !ProductRepository::new(state.pool()).exists(id).await? {
        return Err(product_not_found());
    }
    let reviews = ReviewRepository::new(state.pool())
        .list_for_product(id)
        .await?;
    Ok(Json(reviews))
}

/// Review a product. One review per user per product.
///
/// POST /api/{id}/reviews
#[instrument(skip(state, user, req))]
async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let rating = Rating::new(req.rating)?;
    let comment = req.comment.trim();
    if comment.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }

    let review = ReviewRepository::new(state.pool())
        .create(id, user.id, rating, comment)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => product_not_found(),
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review created successfully",
            review,
        }),
    ))
}
