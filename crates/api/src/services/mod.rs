//! Business logic services for the API.
//!
//! # Services
//!
//! - `auth` - Registration, login, token refresh, logout and password changes
//! - `tokens` - JWT access/refresh token signing and verification
//! - `media` - Product image upload and removal on the media service

pub mod auth;
pub mod media;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use media::{MediaClient, MediaError, UploadedImage};
pub use tokens::{Claims, TokenError, TokenKeys, TokenKind, TokenPair};
