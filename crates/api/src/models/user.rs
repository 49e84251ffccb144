//! Account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mart_africa_core::{Email, Role, ShippingAddressId, UserId};

/// A stored account. The password hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub fullname: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_active: bool,
    pub has_shipping_address: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Name, email and a shipping address are all present.
    #[must_use]
    pub fn profile_complete(&self) -> bool {
        !self.fullname.trim().is_empty()
            && !self.email.as_str().is_empty()
            && self.has_shipping_address
    }
}

/// Public identity attached to reviews and product owners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub fullname: String,
}

/// The authenticated caller, built from a verified access token.
///
/// Passed explicitly to every operation that needs to know who is acting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Admins may modify anything; everyone else only what they own.
    #[must_use]
    pub fn can_modify(&self, owner_id: UserId) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

/// A user's single shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingAddress {
    pub id: ShippingAddressId,
    #[serde(skip)]
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(fullname: &str, has_shipping_address: bool) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("ada@mart.africa").unwrap(),
            fullname: fullname.to_string(),
            role: Role::Regular,
            is_admin: false,
            is_active: true,
            has_shipping_address,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_profile_complete_requires_address_and_name() {
        assert!(user("Ada Obi", true).profile_complete());
        assert!(!user("Ada Obi", false).profile_complete());
        assert!(!user("   ", true).profile_complete());
    }

    #[test]
    fn test_current_user_can_modify() {
        let owner = CurrentUser {
            id: UserId::new(7),
            email: "owner@mart.africa".to_string(),
            role: Role::Regular,
        };
        assert!(owner.can_modify(UserId::new(7)));
        assert!(!owner.can_modify(UserId::new(8)));

        let admin = CurrentUser {
            role: Role::Admin,
            ..owner
        };
        assert!(admin.can_modify(UserId::new(8)));
    }
}
