//! Core types for Nutrishop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod pagination;
pub mod price;

pub use id::*;
pub use identity::{GuestToken, GuestTokenError, Identity, OwnerColumnsError, UserId};
pub use pagination::{PageInfo, PageRequest, PageRequestError};
pub use price::Price;
