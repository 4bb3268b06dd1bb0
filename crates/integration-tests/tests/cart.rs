//! Integration tests for the cart API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database seeded with `crates/cli/seed/catalog.yaml`
//! - The storefront server running (cargo run -p nutrishop-storefront)
//!
//! Run with: cargo test -p nutrishop-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nutrishop_integration_tests::{client, fresh_guest_id, json_body, seeded_product, url};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

async fn get_cart(client: &Client, guest_id: &str) -> Value {
    let response = client
        .get(url(&format!("/api/cart?guestId={guest_id}")))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

async fn add_item(client: &Client, body: Value) -> reqwest::Response {
    client
        .post(url("/api/cart"))
        .json(&body)
        .send()
        .await
        .expect("Failed to add item")
}

fn number(value: &Value) -> f64 {
    value.as_f64().expect("expected a number")
}

// ============================================================================
// Read Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_fresh_guest_cart_is_empty() {
    let client = client();
    let cart = get_cart(&client, &fresh_guest_id()).await;

    assert_eq!(cart["items"], json!([]));
    assert!(number(&cart["totalAmount"]).abs() < f64::EPSILON);
    assert!(number(&cart["totalMrp"]).abs() < f64::EPSILON);
    assert!(number(&cart["discount"]).abs() < f64::EPSILON);
    assert_eq!(cart["itemCount"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_anonymous_without_guest_id() {
    let response = client().get(url("/api/cart")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["error"],
        "Guest ID is required for unauthenticated users"
    );
}

// ============================================================================
// Add Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_same_line_twice_merges_quantity() {
    let client = client();
    let guest_id = fresh_guest_id();
    let (product_id, _) = seeded_product(&client).await;

    let first = add_item(
        &client,
        json!({ "productId": product_id, "quantity": 2, "guestId": guest_id }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = json_body(first).await;
    assert_eq!(first["quantity"], 2);

    let second = add_item(
        &client,
        json!({ "productId": product_id, "quantity": 3, "guestId": guest_id }),
    )
    .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second = json_body(second).await;
    assert_eq!(second["quantity"], 5);
    assert_eq!(second["id"], first["id"]);

    let cart = get_cart(&client, &guest_id).await;
    assert_eq!(cart["itemCount"], 1);
    assert_eq!(cart["items"][0]["quantity"], 5);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_variant_lines_are_separate_and_totals_add_up() {
    let client = client();
    let guest_id = fresh_guest_id();
    let (product_id, variant_id) = seeded_product(&client).await;
    let variant_id = variant_id.expect("seeded product has variants");

    let response = add_item(
        &client,
        json!({ "productId": product_id, "quantity": 1, "guestId": guest_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = add_item(
        &client,
        json!({
            "productId": product_id,
            "variantId": variant_id,
            "quantity": 2,
            "guestId": guest_id,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cart = get_cart(&client, &guest_id).await;
    assert_eq!(cart["itemCount"], 2);

    let total_amount = number(&cart["totalAmount"]);
    let total_mrp = number(&cart["totalMrp"]);
    let discount = number(&cart["discount"]);
    assert!((discount - (total_mrp - total_amount)).abs() < 0.005);
    assert!(total_amount > 0.0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_merge_past_line_limit_is_rejected() {
    let client = client();
    let guest_id = fresh_guest_id();
    let (product_id, _) = seeded_product(&client).await;

    let response = add_item(
        &client,
        json!({ "productId": product_id, "quantity": 999, "guestId": guest_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = add_item(
        &client,
        json!({ "productId": product_id, "quantity": 1, "guestId": guest_id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Quantity cannot exceed 999"
    );

    let cart = get_cart(&client, &guest_id).await;
    assert_eq!(cart["items"][0]["quantity"], 999);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_unknown_product() {
    let response = add_item(
        &client(),
        json!({ "productId": 99_999_999, "quantity": 1, "guestId": fresh_guest_id() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Product not found");
}

// ============================================================================
// Update & Remove Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_update_to_zero_removes_line() {
    let client = client();
    let guest_id = fresh_guest_id();
    let (product_id, _) = seeded_product(&client).await;

    let item = json_body(
        add_item(
            &client,
            json!({ "productId": product_id, "quantity": 1, "guestId": guest_id }),
        )
        .await,
    )
    .await;

    let response = client
        .put(url("/api/cart"))
        .json(&json!({ "cartItemId": item["id"], "quantity": 4, "guestId": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["quantity"], 4);

    let response = client
        .put(url("/api/cart"))
        .json(&json!({ "cartItemId": item["id"], "quantity": 0, "guestId": guest_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Item removed from cart" })
    );

    let cart = get_cart(&client, &guest_id).await;
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_other_guest_cannot_modify_line() {
    let client = client();
    let owner = fresh_guest_id();
    let intruder = fresh_guest_id();
    let (product_id, _) = seeded_product(&client).await;

    let item = json_body(
        add_item(
            &client,
            json!({ "productId": product_id, "quantity": 2, "guestId": owner }),
        )
        .await,
    )
    .await;

    let response = client
        .put(url("/api/cart"))
        .json(&json!({ "cartItemId": item["id"], "quantity": 9, "guestId": intruder }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .delete(url(&format!(
            "/api/cart?cartItemId={}&guestId={intruder}",
            item["id"]
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let cart = get_cart(&client, &owner).await;
    assert_eq!(cart["items"][0]["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_remove_twice() {
    let client = client();
    let guest_id = fresh_guest_id();
    let (product_id, _) = seeded_product(&client).await;

    let item = json_body(
        add_item(
            &client,
            json!({ "productId": product_id, "quantity": 1, "guestId": guest_id }),
        )
        .await,
    )
    .await;
    let remove_url = url(&format!(
        "/api/cart?cartItemId={}&guestId={guest_id}",
        item["id"]
    ));

    let response = client.delete(&remove_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], "Item removed from cart");

    let response = client.delete(&remove_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Cart item not found");
}
