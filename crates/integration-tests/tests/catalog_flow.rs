//! End-to-end tests for categories, products, wishlists and reviews.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (mart-cli migrate)
//! - The API running with `MART_ADMIN_SIGNUP_KEY` set
//!
//! Run with: cargo test -p mart-africa-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use mart_africa_integration_tests::{TestContext, error_kind, expect_status};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_virtual_fields() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let product = ctx.create_product(&admin, category, 4).await;

    assert_eq!(product["qty_left"], 4);
    assert_eq!(product["is_in_stock"], true);
    assert_eq!(product["is_low_stock"], true);
    assert_eq!(product["total_reviews"], 0);
    assert_eq!(product["sizes"], json!(["S", "M"]));

    let id = product["id"].as_i64().unwrap();
    let resp = ctx
        .patch(&format!("/api/products/{id}"), Some(&admin.tokens.access))
        .json(&json!({"total_sold": 4}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert_eq!(body["product"]["qty_left"], 0);
    assert_eq!(body["product"]["is_in_stock"], false);

    let resp = ctx
        .patch(&format!("/api/products/{id}"), Some(&admin.tokens.access))
        .json(&json!({"total_sold": 9}))
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::BAD_REQUEST).await;
    assert_eq!(error_kind(&body), "validation_error");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_product_list_filters_by_category() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    ctx.create_product(&admin, category, 10).await;
    ctx.create_product(&admin, category, 0).await;

    let resp = ctx
        .get(
            &format!("/api/products?category={category}&in_stock=true"),
            None,
        )
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let resp = ctx
        .get(&format!("/api/products/categories/{category}"), None)
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert_eq!(body["products_count"], 2);

    // Categories with products can't be deleted.
    let resp = ctx
        .delete(
            &format!("/api/products/categories/{category}"),
            Some(&admin.tokens.access),
        )
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::CONFLICT).await;
    assert_eq!(error_kind(&body), "conflict");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_regular_user_cannot_create_products() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let shopper = ctx.register_user().await;

    let resp = ctx
        .post("/api/products", Some(&shopper.tokens.access))
        .json(&json!({
            "name": "Sneaky",
            "description": "",
            "brand": "",
            "category_id": category,
            "price": "1.00",
        }))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::FORBIDDEN).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_wishlist_add_is_idempotent() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let product = ctx.create_product(&admin, category, 10).await;
    let shopper = ctx.register_user().await;
    let token = Some(shopper.tokens.access.as_str());
    let body = json!({"product_id": product["id"]});

    let resp = ctx
        .post("/api/products/wishlist", token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let first = expect_status(resp, StatusCode::CREATED).await;

    let resp = ctx
        .post("/api/products/wishlist/", token)
        .json(&body)
        .send()
        .await
        .unwrap();
    let second = expect_status(resp, StatusCode::OK).await;
    assert_eq!(first["item"]["id"], second["item"]["id"]);

    let resp = ctx.get("/api/products/wishlist", token).send().await.unwrap();
    let items = expect_status(resp, StatusCode::OK).await;
    assert_eq!(items.as_array().unwrap().len(), 1);

    let resp = ctx
        .delete("/api/products/wishlist", token)
        .json(&body)
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::NO_CONTENT).await;

    let item_id = first["item"]["id"].as_i64().unwrap();
    let resp = ctx
        .delete(&format!("/api/products/wishlist/{item_id}"), token)
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_one_review_per_user() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let product = ctx.create_product(&admin, category, 10).await;
    let id = product["id"].as_i64().unwrap();
    let shopper = ctx.register_user().await;
    let token = Some(shopper.tokens.access.as_str());

    let resp = ctx
        .post(&format!("/api/{id}/reviews"), token)
        .json(&json!({"rating": 6, "comment": "Too good"}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::BAD_REQUEST).await;

    let resp = ctx
        .post(&format!("/api/products/{id}/reviews"), token)
        .json(&json!({"rating": 4, "comment": "Lovely colours"}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::CREATED).await;

    let resp = ctx
        .post(&format!("/api/{id}/reviews"), token)
        .json(&json!({"rating": 2, "comment": "Changed my mind"}))
        .send()
        .await
        .unwrap();
    expect_status(resp, StatusCode::CONFLICT).await;

    let resp = ctx.get(&format!("/api/products/{id}"), None).send().await.unwrap();
    let detail = expect_status(resp, StatusCode::OK).await;
    assert_eq!(detail["total_reviews"], 1);
    assert_eq!(detail["average_rating"], 4.0);
    assert_eq!(detail["reviews"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_min_rating_matches_displayed_average() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let product = ctx.create_product(&admin, category, 10).await;
    let id = product["id"].as_i64().unwrap();

    // 4 + 4 + 4 + 5 = 17 / 4 = 4.25, displayed as 4.3
    for rating in [4, 4, 4, 5] {
        let reviewer = ctx.register_user().await;
        let resp = ctx
            .post(&format!("/api/products/{id}/reviews"), Some(&reviewer.tokens.access))
            .json(&json!({"rating": rating}))
            .send()
            .await
            .unwrap();
        expect_status(resp, StatusCode::CREATED).await;
    }

    let resp = ctx
        .get(&format!("/api/products?category={category}&min_rating=4.3"), None)
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["average_rating"], 4.3);

    let resp = ctx
        .get(&format!("/api/products?category={category}&min_rating=4.4"), None)
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    assert!(body["results"].as_array().unwrap().is_empty());
}
