//! Whole-request timeout.
//!
//! `tower-http`'s `TimeoutLayer` answers an expired request with a bare
//! status and no body. [`with_request_timeout`] wraps it so the client gets
//! the same JSON 503 and `Retry-After` as any other overload response.

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware::map_response,
    response::{IntoResponse, Response},
};
use tower_http::timeout::TimeoutLayer;

use crate::error::AppError;

/// Bound every request in `router` by `timeout`.
pub fn with_request_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(map_response(timed_out_as_unavailable))
}

/// Handlers never answer 408 themselves, so a 408 here came from the timeout.
async fn timed_out_as_unavailable(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn app(timeout: Duration) -> Router {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "done"
                }),
            )
            .route("/fast", get(|| async { "done" }));

        with_request_timeout(router, timeout)
    }

    async fn get_path(app: Router, path: &str) -> Response {
        app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_expired_request_is_retryable_json() {
        let response = get_path(app(Duration::from_millis(50)), "/slow").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Service temporarily unavailable, please retry");
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let response = get_path(app(Duration::from_secs(5)), "/fast").await;

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"done");
    }
}
