//! Wishlist routes for the signed-in user.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::{ProductId, WishlistItemId};

use crate::db::{RepositoryError, WishlistRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::WishlistItem;
use crate::state::AppState;

/// Build the wishlist router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products/wishlist",
            get(list_wishlist)
                .post(add_to_wishlist)
                .delete(remove_product),
        )
        .route("/api/products/wishlist/{id}", delete(remove_entry))
}

#[derive(Debug, Deserialize)]
pub struct WishlistProductRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub message: &'static str,
    pub item: WishlistItem,
}

fn entry_not_found(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Wishlist item not found".to_string()),
        other => other.into(),
    }
}

/// The caller's wishlist, newest first.
///
/// GET /api/products/wishlist
#[instrument(skip_all)]
async fn list_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistItem>>> {
    let items = WishlistRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(items))
}

/// Add a product. Adding one that's already there returns the existing
/// entry with 200 instead of 201.
///
/// POST /api/products/wishlist
#[instrument(skip(state, user))]
async fn add_to_wishlist(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<WishlistProductRequest>,
) -> Result<(StatusCode, Json<WishlistResponse>)> {
    let (item, created) = WishlistRepository::new(state.pool())
        .add(user.id, req.product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            other => other.into(),
        })?;

    let response = if created {
        (
            StatusCode::CREATED,
            Json(WishlistResponse {
                message: "Product added to wishlist",
                item,
            }),
        )
    } else {
        (
            StatusCode::OK,
            Json(WishlistResponse {
                message: "Product already in wishlist",
                item,
            }),
        )
    };
    Ok(response)
}

/// Remove a product from the caller's wishlist.
///
/// DELETE /api/products/wishlist
#[instrument(skip(state, user))]
async fn remove_product(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<WishlistProductRequest>,
) -> Result<StatusCode> {
    WishlistRepository::new(state.pool())
        .remove_by_product(user.id, req.product_id)
        .await
        .map_err(entry_not_found)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove one of the caller's entries by its id.
///
/// DELETE /api/products/wishlist/{id}
#[instrument(skip(state, user))]
async fn remove_entry(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<WishlistItemId>,
) -> Result<StatusCode> {
    WishlistRepository::new(state.pool())
        .remove_by_id(user.id, id)
        .await
        .map_err(entry_not_found)?;
    Ok(StatusCode::NO_CONTENT)
}
