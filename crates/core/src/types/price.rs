//! Catalog prices using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors raised when validating a price.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("price must be at least 0.01")]
    NotPositive,
    #[error("price can have at most 2 decimal places")]
    TooPrecise,
    #[error("price must be at most {max}", max = Price::MAX)]
    TooLarge,
}

/// A positive amount with at most two decimal places.
///
/// Mirrors a `NUMERIC(10, 2)` column: values up to `99_999_999.99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Largest representable price.
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Validate an amount as a price.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for zero, negative, over-precise or oversized amounts.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount.round_dp(2)))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_max_constant() {
        assert_eq!(Price::MAX, dec("99999999.99"));
    }

    #[test]
    fn test_valid_prices() {
        assert_eq!(Price::new(dec("0.01")).unwrap().to_string(), "0.01");
        assert_eq!(Price::new(dec("1500")).unwrap().to_string(), "1500.00");
        assert_eq!(Price::new(dec("19.90")).unwrap().amount(), dec("19.90"));
    }

    #[test]
    fn test_rejects_invalid_prices() {
        assert_eq!(Price::new(Decimal::ZERO), Err(PriceError::NotPositive));
        assert_eq!(Price::new(dec("-4.00")), Err(PriceError::NotPositive));
        assert_eq!(Price::new(dec("9.999")), Err(PriceError::TooPrecise));
        assert_eq!(Price::new(dec("100000000")), Err(PriceError::TooLarge));
    }
}
