//! Admin-only routes: dashboard, user management and order fulfillment.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::{Email, OrderId, OrderStatus, UserId};

use crate::db::orders::OrderUpdate;
use crate::db::users::UserUpdate;
use crate::db::{OrderRepository, StatsRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{AdminDashboard, Order, User};
use crate::state::AppState;

use super::optional_text;

const MAX_NAME_CHARS: usize = 255;
const MAX_PAYMENT_STATUS_CHARS: usize = 50;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/users", get(list_users))
        .route(
            "/api/admin/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/admin/orders", get(list_orders))
        .route("/api/admin/orders/{id}", get(get_order).patch(update_order))
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminUserUpdateRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderUpdateRequest {
    pub payment_status: Option<String>,
    pub status: Option<OrderStatus>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AdminOrderResponse {
    pub message: &'static str,
    pub order: Order,
}

// =============================================================================
// Dashboard
// =============================================================================

/// User counts and the five newest accounts.
///
/// GET /api/admin/dashboard
#[instrument(skip_all)]
async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<AdminDashboard>> {
    let dashboard = StatsRepository::new(state.pool()).admin_dashboard().await?;
    Ok(Json(dashboard))
}

// =============================================================================
// Users
// =============================================================================

/// All users, newest first.
///
/// GET /api/admin/users
#[instrument(skip_all)]
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list_all().await?;
    Ok(Json(users))
}

/// GET /api/admin/users/{id}
#[instrument(skip(state, _admin))]
async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Update any account, including its role and active flag.
///
/// PATCH /api/admin/users/{id}
#[instrument(skip(state, admin, req))]
async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(req): ApiJson<AdminUserUpdateRequest>,
) -> Result<Json<AdminUserResponse>> {
    let update = UserUpdate {
        fullname: optional_text("fullname", req.fullname.as_deref(), MAX_NAME_CHARS)?,
        email: req.email.as_deref().map(Email::parse).transpose()?,
        is_admin: req.is_admin,
        is_active: req.is_active,
    };

    let user = UserRepository::new(state.pool()).update(id, update).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, "User updated by admin");

    Ok(Json(AdminUserResponse {
        message: "User updated successfully",
        user,
    }))
}

/// Delete an account and everything it owns. Admins can't delete themselves.
///
/// DELETE /api/admin/users/{id}
#[instrument(skip(state, admin))]
async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode> {
    if id == admin.id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let image_ids = UserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, images = image_ids.len(), "User deleted");

    if let Some(media) = state.media() {
        media.destroy_all(&image_ids).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Orders
// =============================================================================

/// All orders, newest first, optionally filtered by status.
///
/// GET /api/admin/orders
#[instrument(skip(state, _admin))]
async fn list_orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let orders = OrderRepository::new(state.pool()).list_all(status).await?;
    Ok(Json(orders))
}

/// GET /api/admin/orders/{id}
#[instrument(skip(state, _admin))]
async fn get_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Update payment status, fulfillment status or delivery time.
///
/// PATCH /api/admin/orders/{id}
#[instrument(skip(state, admin, req))]
async fn update_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(req): ApiJson<AdminOrderUpdateRequest>,
) -> Result<Json<AdminOrderResponse>> {
    let update = OrderUpdate {
        payment_status: optional_text(
            "payment_status",
            req.payment_status.as_deref(),
            MAX_PAYMENT_STATUS_CHARS,
        )?,
        status: req.status,
        delivered_at: req.delivered_at,
    };

    let order = OrderRepository::new(state.pool())
        .admin_update(id, update)
        .await?;
    tracing::info!(
        admin_id = %admin.id,
        order_number = %order.order_number,
        status = %order.status,
        "Order updated by admin"
    );

    Ok(Json(AdminOrderResponse {
        message: "Order updated successfully",
        order,
    }))
}
