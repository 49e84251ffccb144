//! HTTP route handlers for the Mart Africa API.
//!
//! Every path also accepts a trailing slash (`/api/products/` and
//! `/api/products` are the same route).
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database)
//!
//! # Auth (public)
//! POST /api/register                    - Register a regular account
//! POST /api/admin/register              - Register an admin (X-Admin-Signup-Key)
//! POST /api/login                       - Exchange credentials for tokens
//! POST /api/refresh                     - New access token from a refresh token
//! POST /api/token/refresh               - Alias of /api/refresh
//! POST /api/logout                      - Revoke a refresh token
//!
//! # Account (signed in)
//! GET  /api/profile                     - Own profile
//! PATCH /api/profile                    - Update fullname/email
//! POST /api/change-password             - Change password
//! GET|POST|PATCH|DELETE /api/shipping-address
//! GET  /api/dashboard                   - Regular users only
//!
//! # Admin
//! GET  /api/admin/dashboard             - User counts and recent signups
//! GET  /api/admin/users                 - All users, newest first
//! GET|PATCH|DELETE /api/admin/users/{id}
//! GET  /api/admin/orders                - All orders (?status=)
//! GET|PATCH /api/admin/orders/{id}
//!
//! # Catalog
//! GET|POST /api/products                - List (filters, ordering, pages) / create
//! GET|PATCH|DELETE /api/products/{id}
//! POST /api/products/{id}/images        - Multipart upload
//! GET  /api/products/admin/stats        - Product statistics
//! GET  /api/products/admin/low-stock    - Low-stock listing (?threshold=)
//! GET|POST /api/products/categories
//! GET|PATCH|DELETE /api/products/categories/{id}
//!
//! # Wishlist (signed in)
//! GET|POST|DELETE /api/products/wishlist
//! DELETE /api/products/wishlist/{id}
//!
//! # Reviews
//! GET|POST /api/{id}/reviews
//! GET|POST /api/products/{id}/reviews
//!
//! # Orders (signed in)
//! GET|POST /api/orders
//! GET  /api/orders/stats
//! GET  /api/orders/{id}
//! PATCH /api/orders/{id}/cancel
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod wishlist;

use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    routing::get,
};
use serde::Serialize;
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use crate::state::AppState;

/// Body of responses that only carry a confirmation.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(account::router())
        .merge(admin::router())
        .merge(categories::router())
        .merge(products::router())
        .merge(wishlist::router())
        .merge(reviews::router())
        .merge(orders::router())
}

/// Build the complete application: routes, health checks and middleware.
///
/// Trailing slashes are trimmed before routing, so the result is wrapped
/// in [`NormalizePath`] rather than returned as a plain `Router`.
pub fn app(state: AppState) -> NormalizePath<Router> {
    let cors = cors_layer(&state.config().cors_origins);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        );

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    let router = router
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// CORS for the configured browser origins; `None` when there are none.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderName::from_static(auth::ADMIN_SIGNUP_KEY_HEADER),
            ])
            .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
            .max_age(Duration::from_secs(3600)),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// =============================================================================
// Input helpers
// =============================================================================

/// Trim a required text field, rejecting blanks and overlong values.
pub(crate) fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value.to_owned())
}

/// [`required_text`] for a field that may be omitted from a partial update.
pub(crate) fn optional_text(
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<Option<String>, AppError> {
    value.map(|v| required_text(field, v, max_chars)).transpose()
}
