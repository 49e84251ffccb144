//! Signed bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs sharing one secret. The
//! `token_type` claim keeps a refresh token from being used as an access
//! token and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use mart_africa_core::{Role, UserId};

use crate::config::JwtConfig;
use crate::models::{CurrentUser, User};

/// Errors from issuing or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// A refresh token was presented where an access token is required, or
    /// the reverse.
    #[error("wrong token type")]
    WrongKind,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Which of the two token kinds a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub token_type: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// The identity this token was issued to.
    #[must_use]
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.sub,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signing and verification keys with the configured lifetimes.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::hours(config.refresh_ttl_hours),
        }
    }

    /// Issue an access and a refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user, TokenKind::Access)?,
            refresh: self.issue(user, TokenKind::Refresh)?,
        })
    }

    /// Issue a new access token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_access(&self, user: &User) -> Result<String, TokenError> {
        self.issue(user, TokenKind::Access)
    }

    fn issue(&self, user: &User, kind: TokenKind) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id,
            email: user.email.as_str().to_owned(),
            role: user.role,
            token_type: kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify a token's signature, expiry and kind.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::Invalid` or
    /// `TokenError::WrongKind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })?;

        if data.claims.token_type != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mart_africa_core::Email;
    use secrecy::SecretString;

    use super::*;

    fn keys() -> TokenKeys {
        TokenKeys::new(&JwtConfig {
            secret: SecretString::from("kQ8v2Lr7Zp4Xw9Tn3Hy6Bc1Md5Fg0Js8"),
            access_ttl_minutes: 30,
            refresh_ttl_hours: 24,
        })
    }

    fn user(role: Role) -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("ngozi@mart.africa").unwrap(),
            fullname: "Ngozi Okafor".to_string(),
            role,
            is_admin: role.is_admin(),
            is_active: true,
            has_shipping_address: false,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_access_token_carries_identity() {
        let keys = keys();
        let pair = keys.issue_pair(&user(Role::Admin)).unwrap();
        let claims = keys.verify(&pair.access, TokenKind::Access).unwrap();

        let current = claims.current_user();
        assert_eq!(current.id, UserId::new(7));
        assert_eq!(current.email, "ngozi@mart.africa");
        assert!(current.is_admin());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let keys = keys();
        let pair = keys.issue_pair(&user(Role::Regular)).unwrap();

        assert!(matches!(
            keys.verify(&pair.refresh, TokenKind::Access),
            Err(TokenError::WrongKind)
        ));
        assert!(matches!(
            keys.verify(&pair.access, TokenKind::Refresh),
            Err(TokenError::WrongKind)
        ));
        assert!(keys.verify(&pair.refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_each_token_has_a_unique_jti() {
        let keys = keys();
        let pair = keys.issue_pair(&user(Role::Regular)).unwrap();
        let access = keys.verify(&pair.access, TokenKind::Access).unwrap();
        let refresh = keys.verify(&pair.refresh, TokenKind::Refresh).unwrap();
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = TokenKeys {
            access_ttl: Duration::seconds(-60),
            ..keys()
        };
        let token = keys.issue_access(&user(Role::Regular)).unwrap();
        assert!(matches!(
            keys.verify(&token, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let other = TokenKeys::new(&JwtConfig {
            secret: SecretString::from("Wm3Qz8Rt1Yx6Kp2Vn9Lb4Hc7Jd0Gf5Sa"),
            access_ttl_minutes: 30,
            refresh_ttl_hours: 24,
        });
        let token = other.issue_access(&user(Role::Regular)).unwrap();
        assert!(matches!(
            keys().verify(&token, TokenKind::Access),
            Err(TokenError::Invalid(_))
        ));
        assert!(keys().verify("not.a.jwt", TokenKind::Access).is_err());
    }
}
