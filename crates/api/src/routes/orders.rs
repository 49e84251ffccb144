//! Order routes for the signed-in user. Fulfillment lives under `/api/admin`.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::{OrderId, Price};

use crate::db::OrderRepository;
use crate::db::orders::NewOrder;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem, OrderStats};
use crate::state::AppState;

use super::required_text;

const MAX_PAYMENT_METHOD_CHARS: usize = 100;
const MAX_CURRENCY_CHARS: usize = 20;
const NOT_SPECIFIED: &str = "Not specified";

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/stats", get(order_stats))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/cancel", patch(cancel_order))
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: serde_json::Value,
    pub payment_method: Option<String>,
    pub currency: Option<String>,
    pub total_price: Decimal,
}

impl CreateOrderRequest {
    fn validate(self) -> Result<NewOrder> {
        if self.order_items.is_empty() {
            return Err(AppError::Validation(
                "order_items must contain at least one item".to_string(),
            ));
        }
        if !self.shipping_address.is_object() {
            return Err(AppError::Validation(
                "shipping_address must be an object".to_string(),
            ));
        }

        let total_price = Price::new(self.total_price)?;
        let payment_method = or_not_specified(
            "payment_method",
            self.payment_method.as_deref(),
            MAX_PAYMENT_METHOD_CHARS,
        )?;
        let currency =
            or_not_specified("currency", self.currency.as_deref(), MAX_CURRENCY_CHARS)?;

        Ok(NewOrder {
            order_items: self.order_items,
            shipping_address: self.shipping_address,
            payment_method,
            currency,
            total_price,
        })
    }
}

/// Trimmed value, or "Not specified" when missing or blank.
fn or_not_specified(field: &str, value: Option<&str>, max_chars: usize) -> Result<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => required_text(field, v, max_chars),
        None => Ok(NOT_SPECIFIED.to_string()),
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: &'static str,
    pub order: Order,
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// The caller's orders, newest first.
///
/// GET /api/orders
#[instrument(skip_all)]
async fn list_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Place an order. It starts pending and unpaid.
///
/// POST /api/orders
#[instrument(skip_all)]
async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let new_order = req.validate()?;
    let order = OrderRepository::new(state.pool())
        .create(user.id, new_order)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order created successfully",
            order,
        }),
    ))
}

/// GET /api/orders/stats
#[instrument(skip_all)]
async fn order_stats(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<OrderStats>> {
    let stats = OrderRepository::new(state.pool())
        .stats_for_user(user.id)
        .await?;
    Ok(Json(stats))
}

/// Other users' orders look the same as missing ones.
///
/// GET /api/orders/{id}
#[instrument(skip(state, user))]
async fn get_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(order_not_found)
}

/// Cancel a pending order.
///
/// PATCH /api/orders/{id}/cancel
#[instrument(skip(state, user))]
async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderResponse>> {
    let repo = OrderRepository::new(state.pool());
    let current = repo
        .get_for_user(user.id, id)
        .await?
        .ok_or_else(order_not_found)?;

    if !current.status.can_cancel() {
        return Err(AppError::Validation(format!(
            "Cannot cancel an order that is {}",
            current.status
        )));
    }

    // Status may have moved on since the read above.
    let order = repo.cancel(user.id, id).await?.ok_or_else(|| {
        AppError::Validation("Only pending orders can be cancelled".to_string())
    })?;

    Ok(Json(OrderResponse {
        message: "Order cancelled successfully",
        order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(body: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_create_order_defaults_payment_fields() {
        let order = request(json!({
            "order_items": [{"product_id": 1, "quantity": 2}],
            "shipping_address": {"city": "Accra"},
            "total_price": "40.00"
        }))
        .validate()
        .unwrap();

        assert_eq!(order.payment_method, NOT_SPECIFIED);
        assert_eq!(order.currency, NOT_SPECIFIED);
        assert_eq!(order.total_price.amount(), "40.00".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_create_order_rejects_empty_items() {
        let err = request(json!({
            "order_items": [],
            "shipping_address": {"city": "Accra"},
            "total_price": "40.00"
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_order_rejects_non_object_address() {
        let err = request(json!({
            "order_items": [{"product_id": 1}],
            "shipping_address": "12 Ring Road",
            "total_price": "40.00"
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_order_rejects_zero_total() {
        let err = request(json!({
            "order_items": [{"product_id": 1}],
            "shipping_address": {"city": "Accra"},
            "total_price": "0"
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_order_blank_currency_is_not_specified() {
        let order = request(json!({
            "order_items": [{"product_id": 1}],
            "shipping_address": {},
            "currency": "   ",
            "total_price": "5"
        }))
        .validate()
        .unwrap();
        assert_eq!(order.currency, NOT_SPECIFIED);
    }

    #[test]
    fn test_create_order_trims_payment_method() {
        let order = request(json!({
            "order_items": [{"product_id": 1}],
            "shipping_address": {"city": "Accra"},
            "payment_method": "  Mobile Money ",
            "currency": "GHS",
            "total_price": 12.5
        }))
        .validate()
        .unwrap();
        assert_eq!(order.payment_method, "Mobile Money");
        assert_eq!(order.currency, "GHS");
    }
}
