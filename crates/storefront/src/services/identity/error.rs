//! Identity provider error types.

use thiserror::Error;

/// Errors that can occur while verifying a bearer token.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider rejected the token (expired, revoked or forged).
    #[error("token rejected by identity provider")]
    Rejected,

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status.
    #[error("identity provider returned HTTP {0}")]
    UnexpectedStatus(u16),

    /// The provider's user endpoint URL could not be built.
    #[error("invalid identity provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl IdentityError {
    /// Whether the provider itself is at fault (as opposed to the token).
    #[must_use]
    pub const fn is_provider_fault(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}
