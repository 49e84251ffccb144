//! Category routes. Reads are public, writes are admin-only.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::state::AppState;

use super::{optional_text, required_text};

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Build the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/products/categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/api/products/categories/{id}",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub message: &'static str,
    pub category: Category,
}

fn description(value: &str) -> Result<String> {
    let value = value.trim();
    if value.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(value.to_owned())
}

/// GET /api/products/categories
#[instrument(skip(state))]
async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(Json(categories))
}

/// POST /api/products/categories
#[instrument(skip(state, _admin))]
async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let name = required_text("name", &req.name, MAX_NAME_CHARS)?;
    let description = description(&req.description)?;

    let category = CategoryRepository::new(state.pool())
        .create(&name, &description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "Category created successfully",
            category,
        }),
    ))
}

/// GET /api/products/categories/{id}
#[instrument(skip(state))]
async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
}

/// PATCH /api/products/categories/{id}
#[instrument(skip(state, _admin))]
async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>> {
    let name = optional_text("name", req.name.as_deref(), MAX_NAME_CHARS)?;
    let description = req.description.as_deref().map(description).transpose()?;

    let category = CategoryRepository::new(state.pool())
        .update(id, name.as_deref(), description.as_deref())
        .await?;

    Ok(Json(CategoryResponse {
        message: "Category updated successfully",
        category,
    }))
}

/// Delete a category that no longer has products.
///
/// DELETE /api/products/categories/{id}
#[instrument(skip(state, _admin))]
async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
