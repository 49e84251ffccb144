//! Domain models returned by repositories and serialized by route handlers.

pub mod catalog;
pub mod dashboard;
pub mod order;
pub mod review;
pub mod user;

pub use catalog::{Category, Product, ProductDetail, ProductImage, WishlistItem};
pub use dashboard::{AdminDashboard, OrderStats, ProductStats, UserDashboard};
pub use order::{Order, OrderItem};
pub use review::Review;
pub use user::{CurrentUser, ShippingAddress, User, UserSummary};
