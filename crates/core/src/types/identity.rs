//! Cart ownership identities.
//!
//! A cart belongs to exactly one of an authenticated principal (resolved by the
//! external identity provider) or an anonymous guest token chosen by the
//! client. [`Identity`] makes that "one of, never both, never neither" rule a
//! property of the type instead of two nullable columns.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal ID issued by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a user ID from a UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Errors that can occur when parsing a [`GuestToken`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuestTokenError {
    /// The input is empty or only whitespace.
    #[error("guest ID cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("guest ID must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("guest ID contains invalid characters")]
    InvalidCharacters,
}

/// An anonymous guest token.
///
/// Clients generate these (typically a UUID kept in local storage) and send
/// them with every cart request until the shopper signs in.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed
/// - Length: 1-128 characters after trimming
/// - No control characters
///
/// ## Examples
///
/// ```
/// use nutrishop_core::GuestToken;
///
/// assert!(GuestToken::parse("4f7d3c7a-1b2c-4d5e-8f90-123456789abc").is_ok());
/// assert!(GuestToken::parse("   ").is_err());
/// assert!(GuestToken::parse("bad\ntoken").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct GuestToken(String);

impl GuestToken {
    /// Maximum length of a guest token.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `GuestToken` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains control characters.
    pub fn parse(s: &str) -> Result<Self, GuestTokenError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(GuestTokenError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(GuestTokenError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_control) {
            return Err(GuestTokenError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for GuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GuestToken {
    type Err = GuestTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for GuestToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors when rebuilding an [`Identity`] from stored owner columns.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnerColumnsError {
    /// Both `user_id` and `guest_id` are set.
    #[error("cart has both a user owner and a guest owner")]
    BothOwners,
    /// Neither `user_id` nor `guest_id` is set.
    #[error("cart has no owner")]
    NoOwner,
    /// The stored guest ID does not parse.
    #[error("stored guest ID is invalid: {0}")]
    InvalidGuest(#[from] GuestTokenError),
}

/// Who a request (or a cart) belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A signed-in shopper.
    Authenticated(UserId),
    /// An anonymous shopper identified by a client-held token.
    Guest(GuestToken),
}

impl Identity {
    /// Rebuild an identity from the nullable `(user_id, guest_id)` column pair.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one column is set.
    pub fn from_owner_columns(
        user_id: Option<Uuid>,
        guest_id: Option<&str>,
    ) -> Result<Self, OwnerColumnsError> {
        match (user_id, guest_id) {
            (Some(user_id), None) => Ok(Self::Authenticated(UserId::new(user_id))),
            (None, Some(guest_id)) => Ok(Self::Guest(GuestToken::parse(guest_id)?)),
            (Some(_), Some(_)) => Err(OwnerColumnsError::BothOwners),
            (None, None) => Err(OwnerColumnsError::NoOwner),
        }
    }

    /// Split into the nullable `(user_id, guest_id)` column pair.
    #[must_use]
    pub fn owner_columns(&self) -> (Option<Uuid>, Option<&str>) {
        match self {
            Self::Authenticated(user_id) => (Some(user_id.as_uuid()), None),
            Self::Guest(token) => (None, Some(token.as_str())),
        }
    }

    /// Whether this identity owns a resource owned by `owner`.
    ///
    /// A user never owns a guest cart and vice versa, even if a guest token
    /// happens to spell a user's UUID.
    #[must_use]
    pub fn owns(&self, owner: &Self) -> bool {
        self == owner
    }

    /// Whether this is a signed-in shopper.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated(user_id) => write!(f, "user:{user_id}"),
            Self::Guest(token) => write!(f, "guest:{token}"),
        }
    }
}
