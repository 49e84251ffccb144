//! Bearer-token authentication extractors.
//!
//! Handlers declare the access they need by taking one of these extractors:
//! [`RequireAuth`] for any signed-in user, [`RequireAdmin`] and
//! [`RequireRegular`] for a specific role. Each yields the verified
//! [`CurrentUser`], which is then passed explicitly to whatever the handler
//! calls.
//!
//! A valid signature is not enough: the token's subject is looked up on every
//! request, so a deleted or deactivated account is rejected immediately and
//! the role comes from the stored `is_admin` flag rather than the claim.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use mart_africa_core::{Role, UserId};

use crate::db::UserRepository;
use crate::db::users::AccountStatus;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::tokens::{TokenError, TokenKind};
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an admin's access token.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires a regular (non-admin) user's access token.
#[derive(Debug, Clone)]
pub struct RequireRegular(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Unauthenticated("Authentication credentials were not provided".to_string())
        })?;

        let claims = state
            .tokens()
            .verify(token, TokenKind::Access)
            .map_err(|e| match e {
                TokenError::Expired => AppError::Unauthenticated("Token has expired".to_string()),
                _ => AppError::Unauthenticated("Token is invalid".to_string()),
            })?;

        let status = UserRepository::new(state.pool())
            .get_status(claims.sub)
            .await?;
        let user = resolve_user(claims.current_user(), status)?;

        Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, Some(&user.email));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(
                "Only admin users can access this".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireRegular {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.is_admin() {
            return Err(AppError::Forbidden(
                "This endpoint is only for regular users".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

impl CurrentUser {
    /// Require that the caller owns `owner_id` or is an admin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` otherwise.
    pub fn ensure_can_modify(&self, owner_id: UserId) -> Result<(), AppError> {
        if self.can_modify(owner_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You do not have permission to modify this resource".to_string(),
            ))
        }
    }
}

/// Reconcile the token's claims with the stored account.
fn resolve_user(
    claimed: CurrentUser,
    stored: Option<AccountStatus>,
) -> Result<CurrentUser, AppError> {
    let status =
        stored.ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))?;
    if !status.is_active {
        return Err(AppError::Unauthenticated("User is inactive".to_string()));
    }
    Ok(CurrentUser {
        id: claimed.id,
        email: status.email,
        role: Role::from_is_admin(status.is_admin),
    })
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn claimed(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(9),
            email: "old@mart.africa".to_string(),
            role,
        }
    }

    fn stored(is_admin: bool, is_active: bool) -> Option<AccountStatus> {
        Some(AccountStatus {
            email: "current@mart.africa".to_string(),
            is_admin,
            is_active,
        })
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/profile/");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&parts(Some("bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_ensure_can_modify() {
        let owner = CurrentUser {
            id: UserId::new(1),
            email: "owner@mart.africa".to_string(),
            role: Role::Regular,
        };
        let stranger = CurrentUser {
            id: UserId::new(2),
            email: "stranger@mart.africa".to_string(),
            role: Role::Regular,
        };
        let admin = CurrentUser {
            id: UserId::new(3),
            email: "admin@mart.africa".to_string(),
            role: Role::Admin,
        };

        assert!(owner.ensure_can_modify(UserId::new(1)).is_ok());
        assert!(matches!(
            stranger.ensure_can_modify(UserId::new(1)),
            Err(AppError::Forbidden(_))
        ));
        assert!(admin.ensure_can_modify(UserId::new(1)).is_ok());
    }

    #[test]
    fn test_resolve_user_takes_role_from_store() {
        let demoted = resolve_user(claimed(Role::Admin), stored(false, true)).unwrap();
        assert_eq!(demoted.role, Role::Regular);
        assert_eq!(demoted.email, "current@mart.africa");
        assert_eq!(demoted.id, UserId::new(9));

        let promoted = resolve_user(claimed(Role::Regular), stored(true, true)).unwrap();
        assert!(promoted.is_admin());
    }

    #[test]
    fn test_resolve_user_rejects_missing_account() {
        assert!(matches!(
            resolve_user(claimed(Role::Admin), None),
            Err(AppError::Unauthenticated(msg)) if msg == "User not found"
        ));
    }

    #[test]
    fn test_resolve_user_rejects_inactive_account() {
        assert!(matches!(
            resolve_user(claimed(Role::Regular), stored(false, false)),
            Err(AppError::Unauthenticated(msg)) if msg == "User is inactive"
        ));
    }
}
