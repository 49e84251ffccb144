//! Mart Africa API library.
//!
//! The HTTP server is built from this library so route handlers and
//! repositories can be exercised from tests and the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
