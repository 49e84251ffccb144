//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! mart-cli admin create -e admin@example.com -n "Admin Name" -p 'a long passphrase'
//! ```
//!
//! Accounts created here skip the signup key that `POST /api/admin/register`
//! requires, so this is how the first admin gets in.

use thiserror::Error;

use mart_africa_api::db::{RepositoryError, UserRepository};
use mart_africa_api::services::AuthError;
use mart_africa_api::services::auth::{hash_password, validate_password};
use mart_africa_core::{Email, EmailError, Role};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected or hashing failed.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create a new admin account.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, the email is
/// taken, or the database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    validate_password(password, &email)?;
    let password_hash = hash_password(password)?;

    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .create_with_password(&email, name.trim(), &password_hash, Role::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("Admin account created successfully!");
    tracing::info!("  ID: {}", user.id);
    tracing::info!("  Email: {}", user.email);
    tracing::info!("  Name: {}", user.fullname);

    Ok(())
}
