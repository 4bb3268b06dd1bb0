//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server faults to Sentry
//! before responding to the client. All route handlers should return
//! `Result<T, AppError>`. Every error response is JSON: `{"error": "..."}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CartError, FilterError, MAX_LINE_QUANTITY};

/// Seconds a client should wait before retrying after a 503.
const RETRY_AFTER_SECS: &str = "1";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Product listing options were invalid.
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The route exists but not for this method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request ran past the whole-request timeout.
    #[error("Request timed out")]
    Timeout,
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    /// Storage error the server is responsible for, if any.
    const fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Self::Database(err) | Self::Cart(CartError::Repository(err)) => Some(err),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        if let Some(err) = self.repository_error() {
            return if err.is_overloaded() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
        }

        match self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::VariantNotFound | CartError::ItemNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartError::VariantMismatch { .. } | CartError::QuantityLimit => {
                    StatusCode::BAD_REQUEST
                }
                CartError::NotOwner => StatusCode::FORBIDDEN,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Filter(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn client_message(&self, status: StatusCode) -> String {
        match status {
            StatusCode::SERVICE_UNAVAILABLE => {
                return "Service temporarily unavailable, please retry".to_string();
            }
            StatusCode::INTERNAL_SERVER_ERROR => return "Internal server error".to_string(),
            _ => {}
        }

        match self {
            Self::Cart(err) => match err {
                CartError::ProductNotFound => "Product not found".to_string(),
                CartError::VariantNotFound => "Variant not found".to_string(),
                CartError::VariantMismatch { .. } => {
                    "Variant does not belong to this product".to_string()
                }
                CartError::QuantityLimit => {
                    format!("Quantity cannot exceed {MAX_LINE_QUANTITY}")
                }
                CartError::ItemNotFound => "Cart item not found".to_string(),
                CartError::NotOwner => "Not authorized to modify this cart".to_string(),
                CartError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Filter(err) => err.to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::MethodNotAllowed => "Method not allowed".to_string(),
            Self::Database(_) | Self::Timeout => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server faults to Sentry; overload is logged but not captured.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(error = %self, "Overloaded, shedding request");
        }

        let body = Json(ErrorBody {
            error: self.client_message(status),
        });
        let mut response = (status, body).into_response();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }

        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::MethodNotAllowed),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(get_status(AppError::Timeout), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            get_status(AppError::Filter(FilterError::InvertedPriceRange)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            get_status(CartError::ItemNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(CartError::NotOwner.into()), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(
                CartError::VariantMismatch {
                    product_id: nutrishop_core::ProductId::new(1),
                    variant_id: nutrishop_core::VariantId::new(2),
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::QuantityLimit.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::Repository(RepositoryError::Timeout).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_overload_sets_retry_after() {
        let response = AppError::Database(RepositoryError::PoolExhausted).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
        let json = body_json(response).await;
        assert_eq!(json["error"], "Service temporarily unavailable, please retry");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response =
            AppError::Database(RepositoryError::DataCorruption("cart 7: no owner".into()))
                .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let json = body_json(
            AppError::BadRequest("Product ID is required".to_string()).into_response(),
        )
        .await;
        assert_eq!(json, serde_json::json!({ "error": "Product ID is required" }));

        let json = body_json(AppError::from(CartError::NotOwner).into_response()).await;
        assert_eq!(json["error"], "Not authorized to modify this cart");

        let json = body_json(AppError::from(CartError::QuantityLimit).into_response()).await;
        assert_eq!(json["error"], "Quantity cannot exceed 999");
    }
}
