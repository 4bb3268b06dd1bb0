//! Caller identity extraction.
//!
//! A request is authenticated when it carries `Authorization: Bearer <token>`
//! and the identity provider accepts the token. Anything else (no header, a
//! malformed header, a rejected token, or an unreachable provider) leaves the
//! caller anonymous; cart routes then fall back to the client's guest ID.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use nutrishop_core::{GuestToken, GuestTokenError, Identity, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Message returned when an anonymous caller sends no guest ID.
pub const GUEST_ID_REQUIRED: &str = "Guest ID is required for unauthenticated users";

/// Extractor for the verified user behind a request, if any.
///
/// Never rejects: verification failures degrade to an anonymous caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(caller: Caller, ApiQuery(query): ApiQuery<CartQuery>) -> Result<...> {
///     let owner = caller.identity(query.guest_id.as_deref())?;
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Option<UserId>);

impl Caller {
    /// Who owns the cart this request operates on.
    ///
    /// A verified user always wins; otherwise the guest ID is required.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the caller is anonymous and the
    /// guest ID is missing or invalid.
    pub fn identity(self, guest_id: Option<&str>) -> Result<Identity, AppError> {
        if let Some(user_id) = self.0 {
            return Ok(Identity::Authenticated(user_id));
        }

        match GuestToken::parse(guest_id.unwrap_or_default()) {
            Ok(token) => Ok(Identity::Guest(token)),
            Err(GuestTokenError::Empty) => Err(AppError::BadRequest(GUEST_ID_REQUIRED.to_string())),
            Err(e) => Err(AppError::BadRequest(format!("Invalid guest ID: {e}"))),
        }
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(Self(None));
        };

        match state.identity().verify(token).await {
            Ok(user_id) => {
                tracing::Span::current().record("user_id", tracing::field::display(user_id));
                set_sentry_user(&user_id);
                Ok(Self(Some(user_id)))
            }
            Err(e) if e.is_provider_fault() => {
                tracing::warn!(error = %e, "Identity provider unavailable, treating caller as guest");
                Ok(Self(None))
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected, treating caller as guest");
                Ok(Self(None))
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
