//! Core types for Mart Africa.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order;
pub mod pagination;
pub mod price;
pub mod rating;
pub mod role;
pub mod size;
pub mod stock;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{ORDER_NUMBER_PREFIX_LEN, OrderStatus, OrderStatusError, is_valid_order_number};
pub use pagination::{PageInfo, PageRequest};
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError, average_rating};
pub use role::{Role, RoleError};
pub use size::{ProductSize, SizeError};
pub use stock::{DEFAULT_LOW_STOCK_THRESHOLD, StockError, StockLevel};
