//! Registration, login and token routes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::Role;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::auth::check_signup_key;
use crate::services::{AuthService, TokenPair};
use crate::state::AppState;

use super::MessageResponse;

/// Header carrying the shared admin signup key.
pub const ADMIN_SIGNUP_KEY_HEADER: &str = "x-admin-signup-key";

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/admin/register", post(admin_register))
        .route("/api/login", post(login))
        .route("/api/refresh", post(refresh))
        .route("/api/token/refresh", post(refresh))
        .route("/api/logout", post(logout))
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Deserialize, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// A user with a freshly issued token pair.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a regular account.
///
/// POST /api/register
#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (user, tokens) = auth
        .register(
            &req.email,
            &req.fullname,
            &req.password,
            &req.password_confirm,
            Role::Regular,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user,
            tokens,
        }),
    ))
}

/// Register an admin account. Requires the configured signup key.
///
/// POST /api/admin/register
#[instrument(skip_all)]
async fn admin_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let presented = headers
        .get(ADMIN_SIGNUP_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    check_signup_key(state.config().admin_signup_key.as_ref(), presented)?;

    let auth = AuthService::new(state.pool(), state.tokens());
    let (user, tokens) = auth
        .register(
            &req.email,
            &req.fullname,
            &req.password,
            &req.password_confirm,
            Role::Admin,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Admin user registered successfully",
            user,
            tokens,
        }),
    ))
}

/// Exchange credentials for an access/refresh token pair.
///
/// POST /api/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let (user, tokens) = auth.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        user,
        tokens,
    }))
}

/// Issue a new access token from a refresh token.
///
/// POST /api/refresh
#[instrument(skip_all)]
async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>> {
    let auth = AuthService::new(state.pool(), state.tokens());
    let access = auth.refresh(&req.refresh).await?;
    Ok(Json(AccessTokenResponse { access }))
}

/// Revoke the presented refresh token, if any.
///
/// The body is optional, so it is parsed by hand rather than through
/// [`ApiJson`].
///
/// POST /api/logout
#[instrument(skip_all)]
async fn logout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<Json<MessageResponse>> {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))?
    };

    let auth = AuthService::new(state.pool(), state.tokens());
    auth.logout(&user, req.refresh.as_deref()).await?;

    Ok(Json(MessageResponse::new("Logout successful")))
}
