//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::tokens::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mart_africa_core::EmailError),

    /// Wrong password or unknown email.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account was deactivated by an admin.
    #[error("this account has been disabled")]
    AccountDisabled,

    #[error("a user with this email already exists")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    #[error("passwords do not match")]
    PasswordMismatch,

    /// The current password given for a password change is wrong.
    #[error("current password is incorrect")]
    IncorrectPassword,

    /// Any other rejected input field.
    #[error("{0}")]
    Validation(String),

    /// Refresh token expired, malformed, revoked, or its user is gone.
    #[error("refresh token is invalid or expired")]
    InvalidRefreshToken,

    /// No admin signup key is configured.
    #[error("admin registration is disabled")]
    SignupDisabled,

    #[error("invalid admin signup key")]
    InvalidSignupKey,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
