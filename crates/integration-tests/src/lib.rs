//! Integration tests for the Nutrishop storefront API.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare a database with the development catalog
//! cargo run -p nutrishop-cli -- migrate
//! cargo run -p nutrishop-cli -- seed catalog crates/cli/seed/catalog.yaml
//!
//! # Start the server, then run the ignored tests
//! cargo run -p nutrishop-storefront
//! cargo test -p nutrishop-integration-tests -- --ignored
//! ```
//!
//! Tests talk to the server over HTTP only. Each cart test uses a fresh
//! guest ID, so runs never see each other's carts.

use reqwest::{Client, Response};
use serde_json::Value;
use uuid::Uuid;

/// Product from the development catalog that has variants.
pub const SEEDED_PRODUCT_SLUG: &str = "whey-protein-isolate";

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Build a URL for an API path such as `/api/cart`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// HTTP client for tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// A guest ID no other test uses.
#[must_use]
pub fn fresh_guest_id() -> String {
    format!("it-{}", Uuid::new_v4())
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn json_body(response: Response) -> Value {
    response
        .json()
        .await
        .expect("Response body was not JSON")
}

/// Look up a seeded product's ID and first variant ID.
///
/// # Panics
///
/// Panics if the development catalog is not loaded.
#[allow(clippy::expect_used)]
pub async fn seeded_product(client: &Client) -> (i64, Option<i64>) {
    let response = client
        .get(url(&format!("/api/product?slug={SEEDED_PRODUCT_SLUG}")))
        .send()
        .await
        .expect("Failed to fetch seeded product");
    assert!(
        response.status().is_success(),
        "seed the development catalog first"
    );

    let product = json_body(response).await;
    let product_id = product["id"].as_i64().expect("product id");
    let variant_id = product["variants"]
        .as_array()
        .and_then(|variants| variants.first())
        .and_then(|variant| variant["id"].as_i64());

    (product_id, variant_id)
}
