//! End-to-end test helpers for the Mart Africa API.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate, then start the API with an admin signup key
//! cargo run -p mart-africa-cli -- migrate
//! MART_ADMIN_SIGNUP_KEY=test-signup-key cargo run -p mart-africa-api
//!
//! # Run the ignored end-to-end tests
//! MART_ADMIN_SIGNUP_KEY=test-signup-key cargo test -p mart-africa-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `MART_API_URL` - Base URL of the running API (default `http://localhost:8000`)
//! - `MART_ADMIN_SIGNUP_KEY` - Must match the server's key for admin tests
//! - `MART_DATABASE_URL` (or `DATABASE_URL`) - The server's database, for
//!   tests that drive repositories directly

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::unwrap_used)]

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use sqlx::PgPool;
use serde_json::{Value, json};
use uuid::Uuid;

/// Password that passes the strength rules for every generated email.
pub const TEST_PASSWORD: &str = "Baobab-Sunrise-2024";

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("MART_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// Connect to the database the running API uses.
pub async fn connect_db() -> PgPool {
    let url = std::env::var("MART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("MART_DATABASE_URL or DATABASE_URL must be set for database tests");
    PgPool::connect(&url).await.expect("failed to connect to database")
}

/// A unique address so tests never collide with each other or earlier runs.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

#[derive(Debug, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

/// A registered account and the tokens it was issued.
#[derive(Debug)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub tokens: Tokens,
}

/// HTTP client bound to the API base URL.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: api_base_url(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }

    #[must_use]
    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), token)
    }

    #[must_use]
    pub fn patch(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.patch(self.url(path)), token)
    }

    #[must_use]
    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.delete(self.url(path)), token)
    }

    /// Register a regular account.
    pub async fn register_user(&self) -> TestUser {
        let email = unique_email("shopper");
        let resp = self
            .post("/api/register", None)
            .json(&registration(&email, "Test Shopper"))
            .send()
            .await
            .expect("register request failed");
        into_user(resp, email).await
    }

    /// Register an admin using `MART_ADMIN_SIGNUP_KEY`.
    pub async fn register_admin(&self) -> TestUser {
        let key = std::env::var("MART_ADMIN_SIGNUP_KEY")
            .expect("MART_ADMIN_SIGNUP_KEY must be set for admin tests");
        let email = unique_email("admin");
        let resp = self
            .post("/api/admin/register", None)
            .header("x-admin-signup-key", key)
            .json(&registration(&email, "Test Admin"))
            .send()
            .await
            .expect("admin register request failed");
        into_user(resp, email).await
    }

    /// Create a category as `admin` and return its id.
    pub async fn create_category(&self, admin: &TestUser) -> i64 {
        let name = format!("Category {}", Uuid::new_v4().simple());
        let resp = self
            .post("/api/products/categories", Some(&admin.tokens.access))
            .json(&json!({"name": name, "description": "Created by tests"}))
            .send()
            .await
            .unwrap();
        let body = expect_status(resp, StatusCode::CREATED).await;
        body["category"]["id"].as_i64().unwrap()
    }

    /// Create a product as `admin` and return its JSON representation.
    pub async fn create_product(&self, admin: &TestUser, category_id: i64, total_qty: i32) -> Value {
        let resp = self
            .post("/api/products", Some(&admin.tokens.access))
            .json(&json!({
                "name": format!("Kente Scarf {}", Uuid::new_v4().simple()),
                "description": "Hand woven",
                "brand": "Bonwire",
                "category_id": category_id,
                "sizes": ["M", "S"],
                "price": "35.50",
                "total_qty": total_qty,
            }))
            .send()
            .await
            .unwrap();
        let body = expect_status(resp, StatusCode::CREATED).await;
        body["product"].clone()
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

fn registration(email: &str, fullname: &str) -> Value {
    json!({
        "email": email,
        "fullname": fullname,
        "password": TEST_PASSWORD,
        "password_confirm": TEST_PASSWORD,
    })
}

async fn into_user(resp: Response, email: String) -> TestUser {
    let body = expect_status(resp, StatusCode::CREATED).await;
    TestUser {
        id: body["user"]["id"].as_i64().unwrap(),
        email,
        tokens: serde_json::from_value(body["tokens"].clone()).unwrap(),
    }
}

/// Assert the status and return the JSON body (`Value::Null` when empty).
pub async fn expect_status(resp: Response, expected: StatusCode) -> Value {
    let status = resp.status();
    let text = resp.text().await.unwrap();
    assert_eq!(status, expected, "unexpected status, body: {text}");
    if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    }
}

/// The `error.kind` of an error response.
#[must_use]
pub fn error_kind(body: &Value) -> &str {
    body["error"]["kind"].as_str().unwrap_or_default()
}
