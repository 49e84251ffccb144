//! Database-level tests for product images.
//!
//! Uploads go through the media service, so these drive
//! [`ProductImageRepository`] directly against the API's database.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database reachable through `MART_DATABASE_URL`
//! - The API running with `MART_ADMIN_SIGNUP_KEY` set
//!
//! Run with: cargo test -p mart-africa-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use mart_africa_api::db::ProductImageRepository;
use mart_africa_api::db::images::NewProductImage;
use mart_africa_core::ProductId;
use mart_africa_integration_tests::{TestContext, connect_db, expect_status};
use reqwest::StatusCode;
use serde_json::Value;

fn image(name: &str) -> NewProductImage {
    NewProductImage {
        image_url: format!("https://media.example.com/{name}.jpg"),
        public_id: format!("mart-africa/products/{name}"),
        alt_text: name.to_string(),
    }
}

fn primaries(images: &[Value]) -> Vec<&Value> {
    images.iter().filter(|i| i["is_primary"] == true).collect()
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_new_primary_image_demotes_the_old_one() {
    let ctx = TestContext::new();
    let admin = ctx.register_admin().await;
    let category = ctx.create_category(&admin).await;
    let product = ctx.create_product(&admin, category, 5).await;
    let id = product["id"].as_i64().unwrap();
    let product_id = ProductId::new(i32::try_from(id).unwrap());

    let pool = connect_db().await;
    let repo = ProductImageRepository::new(&pool);

    // The first upload becomes primary because there is none yet.
    let first = repo
        .add_images(product_id, vec![image("front"), image("side")], false)
        .await
        .unwrap();
    assert!(first[0].is_primary);
    assert!(!first[1].is_primary);

    // Without the flag, later uploads leave the primary alone.
    let second = repo
        .add_images(product_id, vec![image("back")], false)
        .await
        .unwrap();
    assert!(!second[0].is_primary);

    let third = repo
        .add_images(product_id, vec![image("detail")], true)
        .await
        .unwrap();
    assert!(third[0].is_primary);

    let resp = ctx
        .get(&format!("/api/products/{id}/"), None)
        .send()
        .await
        .unwrap();
    let body = expect_status(resp, StatusCode::OK).await;
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 4);

    let primary = primaries(images);
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0]["id"].as_i64().unwrap(), i64::from(third[0].id.as_i32()));
    assert_eq!(body["primary_image"], "https://media.example.com/detail.jpg");
}
