//! Order repository.
//!
//! Items and the shipping address are stored as JSON snapshots so later
//! catalog or address edits never rewrite a placed order.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{ORDER_NUMBER_PREFIX_LEN, OrderId, OrderStatus, Price, UserId};

use super::RepositoryError;
use crate::models::order::{is_paid, total_items};
use crate::models::{Order, OrderItem, OrderStats};

const ORDER_COLUMNS: &str = "id, user_id, order_number, order_items, shipping_address, \
    payment_status, payment_method, total_price, currency, status, delivered_at, \
    created_at, updated_at";

/// Attempts at finding an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    order_number: String,
    order_items: Json<Vec<OrderItem>>,
    shipping_address: Json<serde_json::Value>,
    payment_status: String,
    payment_method: String,
    total_price: Decimal,
    currency: String,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let order_items = row.order_items.0;
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            is_paid: is_paid(&row.payment_status),
            total_items: total_items(&order_items),
            order_number: row.order_number,
            order_items,
            shipping_address: row.shipping_address.0,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            total_price: row.total_price,
            currency: row.currency,
            status: row.status,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A validated order to place.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_items: Vec<OrderItem>,
    pub shipping_address: serde_json::Value,
    pub payment_method: String,
    pub currency: String,
    pub total_price: Price,
}

/// Admin changes to an order. `None` fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct OrderUpdate {
    pub payment_status: Option<String>,
    pub status: Option<OrderStatus>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Generate an order number: seven uppercase letters or digits followed by
/// a number from 10000 to 99999.
#[must_use]
pub fn generate_order_number() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    let mut number: String = (0..ORDER_NUMBER_PREFIX_LEN)
        .map(|_| CHARSET.choose(&mut rng).map_or('A', |&b| char::from(b)))
        .collect();
    number.push_str(&rng.random_range(10_000..=99_999_u32).to_string());
    number
}

/// Repository for order operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM mart.customer_order WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM mart.customer_order \
             WHERE ($1::mart.order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM mart.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM mart.customer_order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Place an order with a freshly generated order number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no unused order number was found.
    #[instrument(skip(self, order), fields(items = order.order_items.len()))]
    pub async fn create(&self, user_id: UserId, order: NewOrder) -> Result<Order, RepositoryError> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = generate_order_number();
            let result = sqlx::query_as::<_, OrderRow>(&format!(
                "INSERT INTO mart.customer_order \
                    (user_id, order_number, order_items, shipping_address, \
                     payment_method, total_price, currency) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ORDER_COLUMNS}"
            ))
            .bind(user_id)
            .bind(&order_number)
            .bind(Json(&order.order_items))
            .bind(Json(&order.shipping_address))
            .bind(&order.payment_method)
            .bind(order.total_price.amount())
            .bind(&order.currency)
            .fetch_one(self.pool)
            .await;

            match result {
                Ok(row) => {
                    tracing::info!(order_number = %order_number, user_id = %user_id, "Order placed");
                    return Ok(row.into());
                }
                Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                    tracing::warn!(order_number = %order_number, "Order number collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RepositoryError::Conflict(
            "could not allocate an order number".to_owned(),
        ))
    }

    /// Cancel one of the user's pending orders.
    ///
    /// Returns `None` if the order doesn't exist, isn't the user's, or is no
    /// longer pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE mart.customer_order SET status = 'cancelled', updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Apply an admin update. Moving to delivered stamps `delivered_at`
    /// unless one is given or already set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    #[instrument(skip(self, update))]
    pub async fn admin_update(
        &self,
        id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE mart.customer_order SET \
                payment_status = COALESCE($2, payment_status), \
                status = COALESCE($3, status), \
                delivered_at = COALESCE( \
                    $4, \
                    CASE WHEN $3 = 'delivered'::mart.order_status AND delivered_at IS NULL \
                         THEN NOW() ELSE delivered_at END \
                ), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.payment_status)
        .bind(update.status)
        .bind(update.delivered_at)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Order totals for a user. Cancelled orders don't count towards spend.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats_for_user(&self, user_id: UserId) -> Result<OrderStats, RepositoryError> {
        let (total_orders, pending_orders, completed_orders, total_spent) =
            sqlx::query_as::<_, (i64, i64, i64, Decimal)>(
                "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'pending'), \
                    COUNT(*) FILTER (WHERE status = 'delivered'), \
                    COALESCE(SUM(total_price) FILTER (WHERE status <> 'cancelled'), 0) \
                 FROM mart.customer_order WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok(OrderStats {
            total_orders,
            pending_orders,
            completed_orders,
            total_spent,
        })
    }

    /// Number of orders a user has placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM mart.customer_order WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use mart_africa_core::is_valid_order_number;

    use super::*;

    #[test]
    fn test_generated_order_numbers_are_well_formed() {
        for _ in 0..200 {
            let number = generate_order_number();
            assert!(is_valid_order_number(&number), "bad order number {number}");
        }
    }
}
