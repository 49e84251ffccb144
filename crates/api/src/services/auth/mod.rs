//! Authentication service.
//!
//! Password registration and login, JWT issue/refresh, logout through the
//! refresh-token revocation list, and password changes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use mart_africa_core::{Email, Role};

use crate::db::{RepositoryError, RevokedTokenRepository, UserRepository};
use crate::models::{CurrentUser, User};
use crate::services::tokens::{TokenKeys, TokenKind, TokenPair};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright regardless of length.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "qwertyuiop",
    "qwerty123",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "admin123",
    "letmein1",
    "trustno1",
    "abc12345",
    "11111111",
    "00000000",
];

/// Authentication service.
///
/// Handles registration, login, token refresh, logout and password changes.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
    tokens: &'a TokenKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenKeys) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new account and issue its first token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip(self, password, password_confirm))]
    pub async fn register(
        &self,
        email: &str,
        fullname: &str,
        password: &str,
        password_confirm: &str,
        role: Role,
    ) -> Result<(User, TokenPair), AuthError> {
        let email = Email::parse(email)?;

        let fullname = fullname.trim();
        if fullname.is_empty() {
            return Err(AuthError::Validation("fullname is required".to_owned()));
        }

        if password != password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password, &email)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_with_password(&email, fullname, &password_hash, role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        let tokens = self.tokens.issue_pair(&user)?;
        tracing::info!(user_id = %user.id, role = %role, "Account registered");

        Ok((user, tokens))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountDisabled` if the account is inactive.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        // A malformed email can't match an account
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (mut user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        self.users.record_login(user.id).await?;
        user.last_login = Some(Utc::now());

        let tokens = self.tokens.issue_pair(&user)?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The new token carries the user's current role, not the role at the
    /// time the refresh token was issued.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` if the token is expired,
    /// malformed, revoked, not a refresh token, or its user is gone or inactive.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        if RevokedTokenRepository::new(self.pool)
            .is_revoked(claims.jti)
            .await?
        {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user = self
            .users
            .get_by_id(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidRefreshToken)?;

        Ok(self.tokens.issue_access(&user)?)
    }

    /// Log out, revoking the presented refresh token if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` if the token is invalid or
    /// was issued to someone else.
    #[instrument(skip(self, refresh_token), fields(user_id = %user.id))]
    pub async fn logout(
        &self,
        user: &CurrentUser,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        let claims = self
            .tokens
            .verify(token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        if claims.sub != user.id {
            return Err(AuthError::InvalidRefreshToken);
        }

        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidRefreshToken)?;
        RevokedTokenRepository::new(self.pool)
            .revoke(claims.jti, user.id, expires_at)
            .await?;

        tracing::info!(jti = %claims.jti, "Refresh token revoked");
        Ok(())
    }

    /// Change the caller's password after verifying the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectPassword` if `old_password` is wrong.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &CurrentUser,
        old_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .users
            .get_by_id(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let password_hash = self
            .users
            .get_password_hash_by_id(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(old_password, &password_hash).map_err(|_| AuthError::IncorrectPassword)?;

        if new_password != new_password_confirm {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(new_password, &stored.email)?;

        let new_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &new_hash).await?;

        tracing::info!("Password changed");
        Ok(())
    }
}

/// Check the `X-Admin-Signup-Key` header against the configured key.
///
/// Both sides are hashed before comparing so the comparison time doesn't
/// depend on how much of the key matched.
///
/// # Errors
///
/// Returns `AuthError::SignupDisabled` if no key is configured.
/// Returns `AuthError::InvalidSignupKey` if the key is missing or wrong.
pub fn check_signup_key(
    configured: Option<&SecretString>,
    presented: Option<&str>,
) -> Result<(), AuthError> {
    let configured = configured.ok_or(AuthError::SignupDisabled)?;
    let presented = presented.ok_or(AuthError::InvalidSignupKey)?;

    let expected = Sha256::digest(configured.expose_secret().as_bytes());
    let actual = Sha256::digest(presented.as_bytes());
    if expected == actual {
        Ok(())
    } else {
        Err(AuthError::InvalidSignupKey)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first failed rule.
pub fn validate_password(password: &str, email: &Email) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "password cannot be entirely numeric".to_owned(),
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(AuthError::WeakPassword("password is too common".to_owned()));
    }

    let local_part = email.local_part().to_lowercase();
    if local_part.chars().count() >= 3 && lowered.contains(&local_part) {
        return Err(AuthError::WeakPassword(
            "password is too similar to the email address".to_owned(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("amara@mart.africa").unwrap()
    }

    #[test]
    fn test_password_rules() {
        assert!(matches!(
            validate_password("short1", &email()),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("9876543210", &email()),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("Password123", &email()),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("Amara-2024!", &email()),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("kente-cloth-77", &email()).is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("kente-cloth-77").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("kente-cloth-77", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_signup_key() {
        let key = SecretString::from("Xr7pQ2mK9vL4tB8nW3zH6cJ1");
        assert!(check_signup_key(Some(&key), Some("Xr7pQ2mK9vL4tB8nW3zH6cJ1")).is_ok());
        assert!(matches!(
            check_signup_key(Some(&key), Some("guess")),
            Err(AuthError::InvalidSignupKey)
        ));
        assert!(matches!(
            check_signup_key(Some(&key), None),
            Err(AuthError::InvalidSignupKey)
        ));
        assert!(matches!(
            check_signup_key(None, Some("anything")),
            Err(AuthError::SignupDisabled)
        ));
    }
}
