//! Read-only aggregate views.

use rust_decimal::Decimal;
use serde::Serialize;

use super::catalog::Product;
use super::user::User;

/// System-wide account counts for admins.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub admin_users: i64,
    pub regular_users: i64,
    pub users_with_shipping_address: i64,
    /// Five newest accounts, newest first.
    pub recent_users: Vec<User>,
}

/// A regular user's own dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct UserDashboard {
    pub user: User,
    pub profile_completion: ProfileCompletion,
    pub stats: UserActivity,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProfileCompletion {
    pub has_shipping_address: bool,
    pub profile_complete: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserActivity {
    pub total_orders: i64,
    pub wishlist_items: i64,
}

impl UserDashboard {
    #[must_use]
    pub fn new(user: User, total_orders: i64, wishlist_items: i64) -> Self {
        let profile_completion = ProfileCompletion {
            has_shipping_address: user.has_shipping_address,
            profile_complete: user.profile_complete(),
        };
        Self {
            user,
            profile_completion,
            stats: UserActivity {
                total_orders,
                wishlist_items,
            },
        }
    }
}

/// Catalog statistics for admins.
#[derive(Debug, Clone, Serialize)]
pub struct ProductStats {
    pub total_products: i64,
    pub total_categories: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub top_selling_products: Vec<Product>,
    pub recent_products: Vec<Product>,
}

/// A user's order totals.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub total_spent: Decimal,
}
