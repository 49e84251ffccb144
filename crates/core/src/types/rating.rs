//! Review ratings and rating averages.

use serde::{Deserialize, Serialize};

/// Error returned for a rating outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between {min} and {max}, got {0}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError(i64);

/// A review rating between 1 and 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Validate a rating.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] if `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError(value))
    }

    /// The rating as a plain integer.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// Mean rating rounded half-up to one decimal place.
///
/// Rounds in integer tenths so the result agrees exactly with
/// `ROUND(total::numeric / count, 1)` in `PostgreSQL`. Returns `0.0` when
/// there are no reviews.
#[must_use]
#[allow(clippy::cast_precision_loss)] // review counts never approach 2^52
pub fn average_rating(rating_total: i64, review_count: i64) -> f64 {
    if review_count <= 0 {
        return 0.0;
    }
    let tenths = (rating_total * 20 + review_count) / (review_count * 2);
    tenths as f64 / 10.0
}
