//! Routes for the signed-in user's own account.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use mart_africa_core::Email;

use crate::db::addresses::{NewShippingAddress, ShippingAddressUpdate};
use crate::db::users::UserUpdate;
use crate::db::{
    OrderRepository, RepositoryError, ShippingAddressRepository, UserRepository, WishlistRepository,
};
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, RequireRegular};
use crate::models::{ShippingAddress, User, UserDashboard};
use crate::services::AuthService;
use crate::state::AppState;

use super::{MessageResponse, optional_text, required_text};

const MAX_NAME_CHARS: usize = 255;
const MAX_ADDRESS_FIELD_CHARS: usize = 100;
const MAX_ADDRESS_LINE_CHARS: usize = 255;
const MAX_CODE_CHARS: usize = 20;

/// Build the account router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(profile).patch(update_profile))
        .route("/api/change-password", post(change_password))
        .route(
            "/api/shipping-address",
            get(shipping_address)
                .post(replace_shipping_address)
                .patch(update_shipping_address)
                .delete(delete_shipping_address),
        )
        .route("/api/dashboard", get(dashboard))
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingAddressRequest {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
    pub phone: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShippingAddressPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShippingAddressResponse {
    pub message: &'static str,
    pub shipping_address: ShippingAddress,
}

impl TryFrom<ShippingAddressRequest> for NewShippingAddress {
    type Error = AppError;

    fn try_from(req: ShippingAddressRequest) -> Result<Self> {
        Ok(Self {
            first_name: required_text("first_name", &req.first_name, MAX_ADDRESS_FIELD_CHARS)?,
            last_name: required_text("last_name", &req.last_name, MAX_ADDRESS_FIELD_CHARS)?,
            address: required_text("address", &req.address, MAX_ADDRESS_LINE_CHARS)?,
            city: required_text("city", &req.city, MAX_ADDRESS_FIELD_CHARS)?,
            postal_code: required_text("postal_code", &req.postal_code, MAX_CODE_CHARS)?,
            province: required_text("province", &req.province, MAX_ADDRESS_FIELD_CHARS)?,
            country: required_text("country", &req.country, MAX_ADDRESS_FIELD_CHARS)?,
            phone: required_text("phone", &req.phone, MAX_CODE_CHARS)?,
        })
    }
}

impl TryFrom<ShippingAddressPatch> for ShippingAddressUpdate {
    type Error = AppError;

    fn try_from(req: ShippingAddressPatch) -> Result<Self> {
        Ok(Self {
            first_name: optional_text(
                "first_name",
                req.first_name.as_deref(),
                MAX_ADDRESS_FIELD_CHARS,
            )?,
            last_name: optional_text("last_name", req.last_name.as_deref(), MAX_ADDRESS_FIELD_CHARS)?,
            address: optional_text("address", req.address.as_deref(), MAX_ADDRESS_LINE_CHARS)?,
            city: optional_text("city", req.city.as_deref(), MAX_ADDRESS_FIELD_CHARS)?,
            postal_code: optional_text("postal_code", req.postal_code.as_deref(), MAX_CODE_CHARS)?,
            province: optional_text("province", req.province.as_deref(), MAX_ADDRESS_FIELD_CHARS)?,
            country: optional_text("country", req.country.as_deref(), MAX_ADDRESS_FIELD_CHARS)?,
            phone: optional_text("phone", req.phone.as_deref(), MAX_CODE_CHARS)?,
        })
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The caller's profile.
///
/// GET /api/profile
#[instrument(skip_all)]
async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// Update the caller's fullname and/or email.
///
/// PATCH /api/profile
#[instrument(skip_all)]
async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<ProfileUpdateRequest>,
) -> Result<Json<ProfileResponse>> {
    let update = UserUpdate {
        fullname: optional_text("fullname", req.fullname.as_deref(), MAX_NAME_CHARS)?,
        email: req.email.as_deref().map(Email::parse).transpose()?,
        ..UserUpdate::default()
    };

    let user = UserRepository::new(state.pool())
        .update(user.id, update)
        .await?;

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user,
    }))
}

/// Change the caller's password.
///
/// POST /api/change-password
#[instrument(skip_all)]
async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.tokens())
        .change_password(
            &user,
            &req.old_password,
            &req.new_password,
            &req.new_password_confirm,
        )
        .await?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

// =============================================================================
// Shipping Address
// =============================================================================

/// The caller's shipping address.
///
/// GET /api/shipping-address
#[instrument(skip_all)]
async fn shipping_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ShippingAddress>> {
    ShippingAddressRepository::new(state.pool())
        .get_for_user(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No shipping address on file".to_string()))
}

/// Create or replace the caller's shipping address. 201 when newly created.
///
/// POST /api/shipping-address
#[instrument(skip_all)]
async fn replace_shipping_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<ShippingAddressRequest>,
) -> Result<(StatusCode, Json<ShippingAddressResponse>)> {
    let address = NewShippingAddress::try_from(req)?;
    let (shipping_address, created) = ShippingAddressRepository::new(state.pool())
        .upsert(user.id, address)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ShippingAddressResponse {
            message: "Shipping address saved successfully",
            shipping_address,
        }),
    ))
}

/// Partially update the caller's existing shipping address.
///
/// PATCH /api/shipping-address
#[instrument(skip_all)]
async fn update_shipping_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(req): ApiJson<ShippingAddressPatch>,
) -> Result<Json<ShippingAddressResponse>> {
    let update = ShippingAddressUpdate::try_from(req)?;
    let shipping_address = ShippingAddressRepository::new(state.pool())
        .update(user.id, update)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound("No shipping address on file".to_string())
            }
            other => other.into(),
        })?;

    Ok(Json(ShippingAddressResponse {
        message: "Shipping address updated successfully",
        shipping_address,
    }))
}

/// Remove the caller's shipping address.
///
/// DELETE /api/shipping-address
#[instrument(skip_all)]
async fn delete_shipping_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    ShippingAddressRepository::new(state.pool())
        .delete(user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Dashboard
// =============================================================================

/// Personal dashboard for regular users.
///
/// GET /api/dashboard
#[instrument(skip_all)]
async fn dashboard(
    State(state): State<AppState>,
    RequireRegular(user): RequireRegular,
) -> Result<Json<UserDashboard>> {
    let pool = state.pool();
    let account = UserRepository::new(pool)
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let total_orders = OrderRepository::new(pool).count_for_user(user.id).await?;
    let wishlist_items = WishlistRepository::new(pool).count_for_user(user.id).await?;

    Ok(Json(UserDashboard::new(account, total_orders, wishlist_items)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full_address() -> ShippingAddressRequest {
        ShippingAddressRequest {
            first_name: " Amina ".to_string(),
            last_name: "Okafor".to_string(),
            address: "12 Marina Road".to_string(),
            city: "Lagos".to_string(),
            postal_code: "101001".to_string(),
            province: "Lagos".to_string(),
            country: "Nigeria".to_string(),
            phone: "+2348012345678".to_string(),
        }
    }

    #[test]
    fn test_new_address_is_trimmed() {
        let address = NewShippingAddress::try_from(full_address()).unwrap();
        assert_eq!(address.first_name, "Amina");
    }

    #[test]
    fn test_new_address_rejects_blank_field() {
        let mut req = full_address();
        req.city = "   ".to_string();
        assert!(matches!(
            NewShippingAddress::try_from(req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_new_address_rejects_long_phone() {
        let mut req = full_address();
        req.phone = "1".repeat(21);
        assert!(NewShippingAddress::try_from(req).is_err());
    }

    #[test]
    fn test_address_patch_keeps_missing_fields() {
        let patch = ShippingAddressPatch {
            city: Some("Abuja".to_string()),
            ..ShippingAddressPatch::default()
        };
        let update = ShippingAddressUpdate::try_from(patch).unwrap();
        assert_eq!(update.city.as_deref(), Some("Abuja"));
        assert!(update.first_name.is_none());
    }
}
