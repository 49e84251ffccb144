//! Orders and their JSON item snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mart_africa_core::{OrderId, OrderStatus, ProductId, UserId};

/// One line of an order as submitted by the client.
///
/// Unknown keys are preserved so the stored snapshot matches what was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OrderItem {
    /// Quantity ordered; a line without a quantity counts as one unit.
    #[must_use]
    pub fn units(&self) -> u64 {
        self.quantity.map_or(1, u64::from)
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: serde_json::Value,
    pub payment_status: String,
    pub payment_method: String,
    pub total_price: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub total_items: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a payment status string means the order was paid.
#[must_use]
pub fn is_paid(payment_status: &str) -> bool {
    payment_status.trim().eq_ignore_ascii_case("paid")
}

/// Total units across all lines.
#[must_use]
pub fn total_items(items: &[OrderItem]) -> u64 {
    items.iter().map(OrderItem::units).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_total_items_defaults_missing_quantity_to_one() {
        let items: Vec<OrderItem> = serde_json::from_value(json!([
            {"product_id": 1, "quantity": 3},
            {"product_id": 2},
            {"name": "Gift wrap", "quantity": 1, "colour": "gold"}
        ]))
        .unwrap();
        assert_eq!(total_items(&items), 5);
        assert_eq!(items[2].extra["colour"], "gold");
    }

    #[test]
    fn test_is_paid_case_insensitive() {
        assert!(is_paid("Paid"));
        assert!(is_paid("PAID"));
        assert!(!is_paid("Not paid"));
    }
}
