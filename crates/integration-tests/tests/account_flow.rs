//! End-to-end tests for registration, tokens, profile and shipping address.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (mart-cli migrate)
//! - The API running (cargo run -p mart-africa-api)
//!
//! Run with: cargo test -p mart-africa-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use mart_africa_integration_tests::{TEST_PASSWORD, TestContext, error_kind, expect_status};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_register_login_and_profile() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;

    let resp = ctx
        .post("/api/login", None)
        .json(&json!({"email": user.email, "password": TEST_PASSWORD}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert!(body["tokens"]["access"].is_string());

    let resp = ctx
        .get("/api/profile/", Some(&user.tokens.access))
        .send()
        .await
        .unwrap();
    let profile = expect_status(resp, StatusCode::OK).await;
    assert_eq!(profile["email"], user.email.as_str());
    assert_eq!(profile["is_admin"], false);
    assert_eq!(profile["has_shipping_address"], false);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;

    let resp = ctx
        .post("/api/register", None)
        .json(&json!({
            "email": user.email,
            "fullname": "Someone Else",
            "password": TEST_PASSWORD,
            "password_confirm": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::CONFLICT).await;
    assert_eq!(error_kind(&body), "conflict");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wrong_password_is_rejected() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;

    let resp = ctx
        .post("/api/login", None)
        .json(&json!({"email": user.email, "password": "not-the-password"}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error_kind(&body), "authentication_error");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_refresh_then_logout_revokes_refresh_token() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;

    let resp = ctx
        .post("/api/token/refresh", None)
        .json(&json!({"refresh": user.tokens.refresh}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert!(body["access"].is_string());

    let resp = ctx
        .post("/api/logout", Some(&user.tokens.access))
        .json(&json!({"refresh": user.tokens.refresh}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;

    let resp = ctx
        .post("/api/refresh", None)
        .json(&json!({"refresh": user.tokens.refresh}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error_kind(&body), "invalid_token");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_change_password() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;
    let new_password = "Savanna-Evening-7781";

    let resp = ctx
        .post("/api/change-password", Some(&user.tokens.access))
        .json(&json!({
            "old_password": "wrong",
            "new_password": new_password,
            "new_password_confirm": new_password,
        }))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::BAD_REQUEST).await;

    let resp = ctx
        .post("/api/change-password", Some(&user.tokens.access))
        .json(&json!({
            "old_password": TEST_PASSWORD,
            "new_password": new_password,
            "new_password_confirm": new_password,
        }))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;

    let resp = ctx
        .post("/api/login", None)
        .json(&json!({"email": user.email, "password": new_password}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_shipping_address_lifecycle() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;
    let token = Some(user.tokens.access.as_str());

    let resp = ctx.get("/api/shipping-address", token).send().await.unwrap();
    expect_status(resp, StatusCode::NOT_FOUND).await;

    let address = json!({
        "first_name": "Ama",
        "last_name": "Mensah",
        "address": "12 Ring Road",
        "city": "Accra",
        "postal_code": "00233",
        "province": "Greater Accra",
        "country": "Ghana",
        "phone": "+233200000000",
    });

    let resp = ctx
        .post("/api/shipping-address", token)
        .json(&address)
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::CREATED).await;

    // A second POST replaces the single address.
    let resp = ctx
        .post("/api/shipping-address", token)
        .json(&address)
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;

    let resp = ctx
        .patch("/api/shipping-address", token)
        .json(&json!({"city": "Kumasi"}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert_eq!(body["shipping_address"]["city"], "Kumasi");
    assert_eq!(body["shipping_address"]["country"], "Ghana");

    let resp = ctx.get("/api/dashboard", token).send().await.unwrap();
    let dashboard = expect_status(resp, StatusCode::OK).await;
    assert_eq!(dashboard["profile_completion"]["has_shipping_address"], true);

    let resp = ctx.delete("/api/shipping-address", token).send().await.unwrap();
    expect_status(resp, StatusCode::NO_CONTENT).await;

    let resp = ctx.get("/api/profile", token).send().await.unwrap();
    let profile = expect_status(resp, StatusCode::OK).await;
    assert_eq!(profile["has_shipping_address"], false);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_dashboards_are_role_exclusive() {
    let ctx = TestContext::new();
    let user = ctx.register_user().await;
    let admin = ctx.register_admin().await;

    let resp = ctx
        .get("/api/admin/dashboard/", Some(&user.tokens.access))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::FORBIDDEN).await;
    assert_eq!(error_kind(&body), "forbidden");

    let resp = ctx
        .get("/api/dashboard/", Some(&admin.tokens.access))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_admin_dashboard_counts_follow_registrations() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;

    let resp = ctx
        .get("/api/admin/dashboard/", Some(&admin.tokens.access))
        .send()
        .await
        .unwrap();
    let before = expect_status(resp, StatusCode::OK).await;

    let user = ctx.register_user().await;

    let resp = ctx
        .get("/api/admin/dashboard/", Some(&admin.tokens.access))
        .send()
        .await
        .unwrap();
    let after = expect_status(resp, StatusCode::OK).await;

    let count = |body: &serde_json::Value, key: &str| body[key].as_i64().unwrap();
    for body in [&before, &after] {
        assert_eq!(
            count(body, "total_users"),
            count(body, "admin_users") + count(body, "regular_users")
        );
    }
    // Other tests may register concurrently, so counts grow by at least one.
    assert!(count(&after, "total_users") > count(&before, "total_users"));
    assert!(count(&after, "regular_users") > count(&before, "regular_users"));

    let recent = after["recent_users"].as_array().unwrap();
    assert!(!recent.is_empty() && recent.len() <= 5);
    assert!(recent[0]["id"].as_i64().unwrap() >= user.id);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_deactivated_user_token_is_rejected() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let user = ctx.register_user().await;

    let resp = ctx
        .patch(&format!("/api/admin/users/{}/", user.id), Some(&admin.tokens.access))
        .json(&json!({"is_active": false}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;

    let resp = ctx
        .get("/api/profile/", Some(&user.tokens.access))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error_kind(&body), "unauthenticated");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_demoted_admin_loses_admin_access() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let demoted = ctx.register_admin().await;

    let resp = ctx
        .patch(&format!("/api/admin/users/{}/", demoted.id), Some(&admin.tokens.access))
        .json(&json!({"is_admin": false}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;

    let resp = ctx
        .get("/api/admin/users/", Some(&demoted.tokens.access))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::FORBIDDEN).await;

    // The same token now reaches regular-only routes.
    let resp = ctx
        .get("/api/dashboard/", Some(&demoted.tokens.access))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_deleted_admin_token_is_rejected() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let deleted = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;

    let resp = ctx
        .delete(&format!("/api/admin/users/{}/", deleted.id), Some(&admin.tokens.access))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::NO_CONTENT).await;

    let resp = ctx
        .post("/api/products/", Some(&deleted.tokens.access))
        .json(&json!({
            "name": "Orphaned Scarf",
            "description": "Never stored",
            "brand": "Bonwire",
            "category_id": category,
            "price": "10.00",
            "total_qty": 1,
        }))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error_kind(&body), "unauthenticated");
}
