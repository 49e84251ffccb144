//! Account roles.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role: {0}. Valid roles: regular, admin")]
pub struct RoleError(String);

/// Role of an authenticated account.
///
/// Stored as the `is_admin` flag on the user row. Every access decision
/// branches on this enum rather than on the raw flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A shopper: manages their own profile, address, wishlist, reviews and orders.
    #[default]
    Regular,
    /// Store staff: manages the catalog, all users and all orders.
    Admin,
}

impl Role {
    /// Build a role from the persisted `is_admin` flag.
    #[must_use]
    pub const fn from_is_admin(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::Regular }
    }

    /// Whether this role carries admin privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Role name as used in tokens and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Self::Regular),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}
