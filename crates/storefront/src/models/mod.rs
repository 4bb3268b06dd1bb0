//! Domain models for the storefront.
//!
//! These are the validated types handlers and services work with; row types
//! that need conversion stay private to the `db` module.

pub mod cart;
pub mod catalog;

pub use cart::{Cart, CartItem, CartLine, CartTotals, CartView, LineProduct};
pub use catalog::{
    Brand, Category, CategoryNode, HealthGoal, Product, ProductDetail, ProductVariant, Review,
};
