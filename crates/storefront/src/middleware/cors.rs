//! CORS for browser clients on other origins.

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

/// CORS layer allowing the configured origins to call the API.
///
/// Origins that are not valid header values are skipped with a warning. With
/// no usable origins the layer adds no `Access-Control-Allow-*` headers, so
/// browsers only allow same-origin calls.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;

    fn app(origins: &[String]) -> Router {
        Router::new()
            .route("/api/brands", get(|| async { "[]" }))
            .layer(cors_layer(origins))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/brands")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_configured_origin_is_allowed() {
        let origins = vec!["https://shop.example.com".to_string()];
        let response = app(&origins)
            .oneshot(preflight("https://shop.example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
    }

    #[tokio::test]
    async fn test_other_origins_get_no_allow_header() {
        let origins = vec!["https://shop.example.com".to_string()];
        let response = app(&origins)
            .oneshot(preflight("https://evil.example.com"))
            .await
            .unwrap();

        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[tokio::test]
    async fn test_no_origins_configured() {
        let response = app(&[])
            .oneshot(preflight("https://shop.example.com"))
            .await
            .unwrap();

        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
