//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Reference data
//! GET    /api/categories       - Root categories with their children
//! GET    /api/brands           - All brands
//! GET    /api/healthGoals      - All health goals
//!
//! # Products
//! GET    /api/products         - Filtered, sorted, paginated listing
//! GET    /api/product?slug=    - Product detail
//!
//! # Cart (bearer token or guestId)
//! GET    /api/cart             - Cart with totals (guestId in query)
//! POST   /api/cart             - Add item (guestId in body)
//! PUT    /api/cart             - Set quantity, <= 0 removes (guestId in body)
//! DELETE /api/cart             - Remove item (cartItemId, guestId in query)
//! ```
//!
//! Any other method on these paths is a 405 and any other path a 404, both
//! with the usual `{"error": ...}` body.

pub mod cart;
pub mod catalog;
pub mod products;

use axum::{Router, routing::get};

use crate::error::AppError;
use crate::state::AppState;

/// Create the `/api` routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(catalog::categories).fallback(method_not_allowed),
        )
        .route("/brands", get(catalog::brands).fallback(method_not_allowed))
        .route(
            "/healthGoals",
            get(catalog::health_goals).fallback(method_not_allowed),
        )
        .route("/products", get(products::index).fallback(method_not_allowed))
        .route("/product", get(products::show).fallback(method_not_allowed))
        .route(
            "/cart",
            get(cart::show)
                .post(cart::add)
                .put(cart::update)
                .delete(cart::remove)
                .fallback(method_not_allowed),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes())
        .fallback(not_found)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{DatabaseConfig, IdentityConfig, LogFormat, StorefrontConfig};
    use crate::db::create_lazy_pool;
    use crate::middleware::GUEST_ID_REQUIRED;

    /// Router whose storage and identity provider are unreachable, so only
    /// requests rejected before any I/O can succeed.
    fn app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://nutrishop@127.0.0.1:1/nutrishop"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            database: DatabaseConfig {
                min_connections: 0,
                acquire_timeout: Duration::from_millis(100),
                ..DatabaseConfig::default()
            },
            identity: IdentityConfig {
                base_url: Url::parse("http://127.0.0.1:1").unwrap(),
                api_key: SecretString::from("test-api-key"),
                cache_ttl: Duration::from_secs(60),
            },
            request_timeout: Duration::from_secs(15),
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = create_lazy_pool(&config.database_url, &config.database).unwrap();
        let state = AppState::new(config, pool).unwrap();

        routes().with_state(state)
    }

    async fn send(request: Request<Body>) -> Response {
        app().oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: Method, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/api/cart")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn error_message(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        json["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_cart_requires_guest_id_when_anonymous() {
        let response = send(get_request("/api/cart")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, GUEST_ID_REQUIRED);
    }

    #[tokio::test]
    async fn test_add_requires_guest_id_before_fields() {
        let response = send(json_request(Method::POST, r#"{"quantity":1}"#)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, GUEST_ID_REQUIRED);
    }

    #[tokio::test]
    async fn test_add_requires_product_id() {
        let response = send(json_request(
            Method::POST,
            r#"{"guestId":"guest-1","quantity":1}"#,
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Product ID is required");
    }

    #[tokio::test]
    async fn test_add_requires_positive_quantity() {
        for body in [
            r#"{"guestId":"guest-1","productId":5,"quantity":0}"#,
            r#"{"guestId":"guest-1","productId":5,"quantity":-2}"#,
            r#"{"guestId":"guest-1","productId":5}"#,
        ] {
            let response = send(json_request(Method::POST, body)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(error_message(response).await, "Valid quantity is required");
        }
    }

    #[tokio::test]
    async fn test_add_rejects_quantity_above_line_limit() {
        for body in [
            r#"{"guestId":"guest-1","productId":5,"quantity":1000}"#,
            r#"{"guestId":"guest-1","productId":5,"quantity":2147483647}"#,
        ] {
            let response = send(json_request(Method::POST, body)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(error_message(response).await, "Quantity cannot exceed 999");
        }
    }

    #[tokio::test]
    async fn test_update_rejects_quantity_above_line_limit() {
        let response = send(json_request(
            Method::PUT,
            r#"{"guestId":"guest-1","cartItemId":9,"quantity":2147483647}"#,
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Quantity cannot exceed 999");
    }

    #[tokio::test]
    async fn test_update_requires_cart_item_id() {
        let response = send(json_request(
            Method::PUT,
            r#"{"guestId":"guest-1","quantity":2}"#,
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Cart item ID is required");
    }

    #[tokio::test]
    async fn test_update_requires_quantity() {
        let response = send(json_request(
            Method::PUT,
            r#"{"guestId":"guest-1","cartItemId":9}"#,
        ))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Quantity is required");
    }

    #[tokio::test]
    async fn test_remove_requires_cart_item_id() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/cart?guestId=guest-1")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Cart item ID is required");
    }

    #[tokio::test]
    async fn test_remove_rejects_non_numeric_cart_item_id() {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/api/cart?guestId=guest-1&cartItemId=abc")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Cart item ID must be an integer");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = send(json_request(Method::POST, "{not json")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!error_message(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_price_filter() {
        let response = send(get_request("/api/products?minPrice=abc")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(response).await,
            "Invalid minPrice: 'abc' is not a valid number"
        );
    }

    #[tokio::test]
    async fn test_unknown_sort_is_bad_request() {
        let response = send(get_request("/api/products?sortBy=popular")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_control_characters_in_listing_options() {
        for (uri, field) in [
            ("/api/products?search=wh%00ey", "search"),
            ("/api/products?categorySlug=prot%00ein", "categorySlug"),
            ("/api/products?brandSlug=%01", "brandSlug"),
            ("/api/products?healthGoal=a%00", "healthGoal"),
            ("/api/products?form=Pow%7Fder", "form"),
        ] {
            let response = send(get_request(uri)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                error_message(response).await,
                format!("Invalid {field}: control characters are not allowed")
            );
        }
    }

    #[tokio::test]
    async fn test_control_characters_in_product_slug() {
        let response = send(get_request("/api/product?slug=whey%00")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(response).await,
            "Invalid slug: control characters are not allowed"
        );
    }

    #[tokio::test]
    async fn test_product_requires_slug() {
        for uri in ["/api/product", "/api/product?slug=", "/api/product?slug=%20"] {
            let response = send(get_request(uri)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(error_message(response).await, "Product slug is required");
        }
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let request = Request::builder()
            .method(Method::PATCH)
            .uri("/api/cart")
            .body(Body::empty())
            .unwrap();
        let response = send(request).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error_message(response).await, "Method not allowed");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/brands")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(request).await.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        for uri in ["/api/orders", "/nope"] {
            let response = send(get_request(uri)).await;

            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(error_message(response).await, "Not found");
        }
    }
}
