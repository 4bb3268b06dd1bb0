//! Catalog domain types.
//!
//! Catalog rows carry no invariants beyond what the schema enforces, so they
//! are decoded straight from `sqlx` rows and serialized as-is.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use nutrishop_core::{BrandId, CategoryId, HealthGoalId, Price, ProductId, ReviewId, VariantId};

/// A product category. Roots have no `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A root category with its direct children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Category>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A health goal products can be tagged with (e.g., "muscle-gain").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HealthGoal {
    pub id: HealthGoalId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable product.
///
/// `price` is the selling price and `mrp` the list price; the gap between
/// them is the discount shown to shoppers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub price: Price,
    pub mrp: Price,
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub stock_quantity: i32,
    pub image_urls: Vec<String>,
    pub weight: Option<String>,
    pub sku: Option<String>,
    pub nutrition_facts: Option<String>,
    pub ingredients: Option<String>,
    pub usage_instructions: Option<String>,
    pub form: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variant of a product (size, flavour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub mrp: Price,
    pub stock_quantity: i32,
    pub weight: Option<String>,
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A shopper review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: Uuid,
    pub rating: i32,
    pub review_text: Option<String>,
    pub is_verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full product page: the product plus everything shown alongside it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub brand: Option<Brand>,
    pub category: Option<Category>,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    pub review_count: usize,
}
