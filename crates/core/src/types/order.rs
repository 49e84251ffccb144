//! Order lifecycle types.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown order status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status: {0}")]
pub struct OrderStatusError(String);

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "mart.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Only orders that haven't started processing can be cancelled by the buyer.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the order has left the pending/processing pipeline.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(OrderStatusError(s.to_owned())),
        }
    }
}

/// Number of leading uppercase alphanumeric characters in an order number.
pub const ORDER_NUMBER_PREFIX_LEN: usize = 7;

/// Check the `AAAAAAA#####` shape of an order number: seven uppercase
/// letters or digits followed by a five digit number from 10000 to 99999.
#[must_use]
pub fn is_valid_order_number(s: &str) -> bool {
    if s.len() != ORDER_NUMBER_PREFIX_LEN + 5 || !s.is_ascii() {
        return false;
    }
    let (prefix, suffix) = s.split_at(ORDER_NUMBER_PREFIX_LEN);
    prefix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && suffix.parse::<u32>().is_ok_and(|n| (10_000..=99_999).contains(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(!OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_number_shape() {
        assert!(is_valid_order_number("AB12CD345678"));
        assert!(is_valid_order_number("ZZZZZZZ10000"));
        assert!(!is_valid_order_number("ab12cd345678"));
        assert!(!is_valid_order_number("AB12CD309999"));
        assert!(!is_valid_order_number("AB12CD3"));
    }
}
