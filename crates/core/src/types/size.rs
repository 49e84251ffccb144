//! Apparel sizes a product can be offered in.

use serde::{Deserialize, Serialize};

/// Error returned for an unknown size code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid size: {0}. Valid sizes are: S, M, L, XL, XXL")]
pub struct SizeError(String);

/// A product size code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductSize {
    #[serde(rename = "S")]
    Small,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Large,
    #[serde(rename = "XL")]
    ExtraLarge,
    #[serde(rename = "XXL")]
    DoubleExtraLarge,
}

impl ProductSize {
    /// All sizes in display order.
    pub const ALL: [Self; 5] = [
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::ExtraLarge,
        Self::DoubleExtraLarge,
    ];

    /// Short code stored in the database and sent over the wire.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
            Self::ExtraLarge => "XL",
            Self::DoubleExtraLarge => "XXL",
        }
    }

    /// Parse a list of size codes, dropping duplicates and sorting.
    ///
    /// # Errors
    ///
    /// Returns [`SizeError`] for the first unknown code.
    pub fn parse_list<S: AsRef<str>>(codes: &[S]) -> Result<Vec<Self>, SizeError> {
        let mut sizes = codes
            .iter()
            .map(|c| c.as_ref().parse())
            .collect::<Result<Vec<Self>, _>>()?;
        sizes.sort_unstable();
        sizes.dedup();
        Ok(sizes)
    }
}

impl std::fmt::Display for ProductSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ProductSize {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|size| size.code() == upper)
            .ok_or_else(|| SizeError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_case_insensitive() {
        assert_eq!("xl".parse::<ProductSize>(), Ok(ProductSize::ExtraLarge));
        assert_eq!("S".parse::<ProductSize>(), Ok(ProductSize::Small));
        assert!("XXXL".parse::<ProductSize>().is_err());
    }

    #[test]
    fn test_parse_list_sorts_and_dedups() {
        let sizes = ProductSize::parse_list(&["XL", "s", "M", "S"]).unwrap();
        assert_eq!(
            sizes,
            vec![ProductSize::Small, ProductSize::Medium, ProductSize::ExtraLarge]
        );
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        let err = ProductSize::parse_list(&["M", "huge"]).unwrap_err();
        assert!(err.to_string().contains("huge"));
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&ProductSize::DoubleExtraLarge).unwrap();
        assert_eq!(json, "\"XXL\"");
    }
}
