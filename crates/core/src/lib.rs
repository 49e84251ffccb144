//! Mart Africa Core - Shared domain types.
//!
//! This crate provides the types and rules used across all Mart Africa components:
//! - `api` - The REST backend (accounts, catalog, reviews, wishlists, orders)
//! - `cli` - Command-line tools for migrations, admin accounts and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Stock levels, rating averages and pagination math
//! live here so they can be tested without a running server.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, ratings, sizes, prices, stock and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
