//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Listings, product pages and reference data (read-only)
//! - `cart` - Cart resolution and line mutations for users and guests
//! - `identity` - Bearer token verification against the identity provider

pub mod cart;
pub mod catalog;
pub mod identity;

pub use cart::{
    AddItem, CartError, CartService, MAX_LINE_QUANTITY, QuantityChange, QuantityUpdate,
};
pub use catalog::{CatalogService, FilterError, ProductFilter, ProductListParams, ProductPage};
pub use identity::{IdentityClient, IdentityError};
