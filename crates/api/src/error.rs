//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Errors are rendered as
//! `{"error": {"kind": "...", "message": "..."}}`; server-side failures are
//! captured to Sentry and their details are never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use mart_africa_core::{
    EmailError, OrderStatusError, PriceError, RatingError, RoleError, SizeError, StockError,
};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::media::MediaError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Media service operation failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Request input was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No valid access token was presented.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request clashes with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An optional backing service isn't configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

macro_rules! validation_from {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<$err> for AppError {
                fn from(err: $err) -> Self {
                    Self::Validation(err.to_string())
                }
            }
        )+
    };
}

validation_from!(
    EmailError,
    OrderStatusError,
    PriceError,
    RatingError,
    RoleError,
    SizeError,
    StockError,
);

impl AppError {
    /// HTTP status and machine-readable kind.
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        const INTERNAL: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "internal_error");

        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                RepositoryError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => INTERNAL,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch
                | AuthError::IncorrectPassword
                | AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                AuthError::InvalidCredentials | AuthError::AccountDisabled => {
                    (StatusCode::UNAUTHORIZED, "authentication_error")
                }
                AuthError::InvalidRefreshToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::EmailTaken => (StatusCode::CONFLICT, "conflict"),
                AuthError::SignupDisabled | AuthError::InvalidSignupKey => {
                    (StatusCode::FORBIDDEN, "forbidden")
                }
                AuthError::Repository(RepositoryError::NotFound) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                AuthError::Repository(RepositoryError::Conflict(_)) => {
                    (StatusCode::CONFLICT, "conflict")
                }
                AuthError::Repository(_) | AuthError::Token(_) | AuthError::PasswordHash => {
                    INTERNAL
                }
            },
            Self::Media(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            Self::Internal(_) => INTERNAL,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::Validation(msg)
            | Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::ServiceUnavailable(msg) => msg.clone(),
            Self::Media(_) => "External service error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(RepositoryError::Conflict(msg)) => msg.clone(),
                AuthError::Repository(RepositoryError::NotFound) => "Not found".to_string(),
                AuthError::Repository(_) | AuthError::Token(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
                other => other.to_string(),
            },
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "error": {
                "kind": kind,
                "message": self.public_message(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = axum::body::to_bytes(err.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthenticated("no token".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("admins only".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::NotFound("product".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Conflict("duplicate".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::ServiceUnavailable("media".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::PasswordMismatch)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::SignupDisabled)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::PasswordHash)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("x".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption(
                "x".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_core_errors_become_validation_errors() {
        let err: AppError = mart_africa_core::Rating::new(6).unwrap_err().into();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let body = body_json(AppError::Auth(AuthError::InvalidRefreshToken)).await;
        assert_eq!(body["error"]["kind"], "invalid_token");
        assert_eq!(body["error"]["message"], "refresh token is invalid or expired");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let body = body_json(AppError::Database(RepositoryError::DataCorruption(
            "row 42 has a bad email".to_string(),
        )))
        .await;
        assert_eq!(body["error"]["kind"], "internal_error");
        assert_eq!(body["error"]["message"], "Internal server error");
    }
}
