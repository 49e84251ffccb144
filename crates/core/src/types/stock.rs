//! Stock counters and the virtual fields derived from them.

use serde::{Deserialize, Serialize};

/// Low-stock threshold applied to products that don't set their own.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Errors raised when stock counters are inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },
    #[error("total sold ({sold}) cannot exceed total quantity ({qty})")]
    OversoldStock { qty: i32, sold: i32 },
}

/// Stored stock counters for a product.
///
/// `qty_left`, `is_in_stock` and `is_low_stock` are never persisted; they
/// are always derived from these three numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub total_qty: i32,
    pub total_sold: i32,
    pub low_stock_threshold: i32,
}

impl StockLevel {
    /// Build validated stock counters.
    ///
    /// # Errors
    ///
    /// Returns [`StockError`] if any counter is negative or more units were
    /// sold than stocked.
    pub const fn new(
        total_qty: i32,
        total_sold: i32,
        low_stock_threshold: i32,
    ) -> Result<Self, StockError> {
        if total_qty < 0 {
            return Err(StockError::Negative { field: "total_qty" });
        }
        if total_sold < 0 {
            return Err(StockError::Negative { field: "total_sold" });
        }
        if low_stock_threshold < 0 {
            return Err(StockError::Negative {
                field: "low_stock_threshold",
            });
        }
        if total_sold > total_qty {
            return Err(StockError::OversoldStock {
                qty: total_qty,
                sold: total_sold,
            });
        }
        Ok(Self {
            total_qty,
            total_sold,
            low_stock_threshold,
        })
    }

    /// Units still available.
    #[must_use]
    pub const fn qty_left(&self) -> i32 {
        self.total_qty - self.total_sold
    }

    #[must_use]
    pub const fn is_in_stock(&self) -> bool {
        self.qty_left() > 0
    }

    /// At or below the product's low-stock threshold (includes sold out).
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.qty_left() <= self.low_stock_threshold
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_qty_left_and_in_stock() {
        let stock = StockLevel::new(20, 5, DEFAULT_LOW_STOCK_THRESHOLD).unwrap();
        assert_eq!(stock.qty_left(), 15);
        assert!(stock.is_in_stock());
        assert!(!stock.is_low_stock());
    }

    #[test]
    fn test_low_stock_at_threshold() {
        let stock = StockLevel::new(10, 5, 5).unwrap();
        assert_eq!(stock.qty_left(), 5);
        assert!(stock.is_low_stock());
        assert!(stock.is_in_stock());
    }

    #[test]
    fn test_sold_out() {
        let stock = StockLevel::new(3, 3, 5).unwrap();
        assert_eq!(stock.qty_left(), 0);
        assert!(!stock.is_in_stock());
        assert!(stock.is_low_stock());
    }

    #[test]
    fn test_rejects_oversold() {
        assert_eq!(
            StockLevel::new(3, 4, 5),
            Err(StockError::OversoldStock { qty: 3, sold: 4 })
        );
    }

    #[test]
    fn test_rejects_negative() {
        assert!(matches!(
            StockLevel::new(-1, 0, 5),
            Err(StockError::Negative { field: "total_qty" })
        ));
        assert!(StockLevel::new(1, 0, -5).is_err());
    }
}
