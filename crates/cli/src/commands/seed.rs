//! Seed the storefront catalog from a YAML file.
//!
//! Every row is upserted on its natural key (`slug` for categories, brands,
//! health goals and products, `sku` for variants), so running the same file
//! twice leaves the catalog unchanged. References between entries (a
//! product's category, a category's parent) are by slug and must resolve
//! within the file.
//!
//! # Usage
//!
//! ```bash
//! nutrishop-cli seed catalog crates/cli/seed/catalog.yaml
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use thiserror::Error;
use tracing::{error, info};

use super::{DatabaseSetupError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Setup(#[from] DatabaseSetupError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Top-level layout of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub brands: Vec<BrandSeed>,
    #[serde(default)]
    pub health_goals: Vec<HealthGoalSeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Slug of the parent category.
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrandSeed {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthGoalSeed {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub mrp: Decimal,
    /// Category slug.
    pub category: String,
    /// Brand slug.
    pub brand: String,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub weight: Option<String>,
    pub sku: Option<String>,
    pub nutrition_facts: Option<String>,
    pub ingredients: Option<String>,
    pub usage_instructions: Option<String>,
    pub form: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    /// Health goal slugs.
    #[serde(default)]
    pub health_goals: Vec<String>,
    #[serde(default)]
    pub variants: Vec<VariantSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantSeed {
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub mrp: Decimal,
    #[serde(default)]
    pub stock_quantity: i32,
    pub weight: Option<String>,
}

/// Rows written by a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub brands: usize,
    pub health_goals: usize,
    pub products: usize,
    pub variants: usize,
}

impl CatalogSeed {
    /// Check the file for problems the database would reject or silently
    /// accept wrongly. Returns one message per problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let categories = unique_slugs(
            "category",
            self.categories.iter().map(|c| c.slug.as_str()),
            &mut errors,
        );
        let brands = unique_slugs(
            "brand",
            self.brands.iter().map(|b| b.slug.as_str()),
            &mut errors,
        );
        let goals = unique_slugs(
            "health goal",
            self.health_goals.iter().map(|g| g.slug.as_str()),
            &mut errors,
        );
        unique_slugs(
            "product",
            self.products.iter().map(|p| p.slug.as_str()),
            &mut errors,
        );

        for category in &self.categories {
            if let Some(parent) = &category.parent {
                if parent == &category.slug {
                    errors.push(format!("category '{}' is its own parent", category.slug));
                } else if !categories.contains(parent.as_str()) {
                    errors.push(format!(
                        "category '{}' has unknown parent '{parent}'",
                        category.slug
                    ));
                }
            }
        }

        let mut skus = HashSet::new();
        for product in &self.products {
            let slug = &product.slug;

            if !categories.contains(product.category.as_str()) {
                errors.push(format!(
                    "product '{slug}' has unknown category '{}'",
                    product.category
                ));
            }
            if !brands.contains(product.brand.as_str()) {
                errors.push(format!("product '{slug}' has unknown brand '{}'", product.brand));
            }
            for goal in &product.health_goals {
                if !goals.contains(goal.as_str()) {
                    errors.push(format!("product '{slug}' has unknown health goal '{goal}'"));
                }
            }
            check_prices(&format!("product '{slug}'"), product.price, product.mrp, &mut errors);

            if let Some(sku) = &product.sku
                && !skus.insert(sku.as_str())
            {
                errors.push(format!("duplicate sku '{sku}'"));
            }

            for variant in &product.variants {
                check_prices(
                    &format!("variant '{}'", variant.sku),
                    variant.price,
                    variant.mrp,
                    &mut errors,
                );
                if !skus.insert(variant.sku.as_str()) {
                    errors.push(format!("duplicate sku '{}'", variant.sku));
                }
            }
        }

        errors
    }
}

fn unique_slugs<'a>(
    kind: &str,
    slugs: impl Iterator<Item = &'a str>,
    errors: &mut Vec<String>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for slug in slugs {
        if slug.trim().is_empty() {
            errors.push(format!("{kind} with empty slug"));
        } else if !seen.insert(slug) {
            errors.push(format!("duplicate {kind} slug '{slug}'"));
        }
    }
    seen
}

fn check_prices(label: &str, price: Decimal, mrp: Decimal, errors: &mut Vec<String>) {
    if price.is_sign_negative() || mrp.is_sign_negative() {
        errors.push(format!("{label} has a negative price"));
    } else if price > mrp {
        errors.push(format!("{label} price {price} exceeds mrp {mrp}"));
    }
}

/// Seed the catalog from a YAML file.
///
/// The file is parsed and validated before connecting; all rows are written
/// in one transaction.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a database
/// operation fails.
pub async fn catalog(path: &Path) -> Result<(), SeedError> {
    if !path.exists() {
        return Err(SeedError::FileNotFound(path.display().to_string()));
    }

    info!(path = %path.display(), "Loading catalog seed");

    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = connect().await?;
    let mut tx = pool.begin().await?;
    let summary = write_catalog(&mut tx, &seed).await?;
    tx.commit().await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Brands: {}", summary.brands);
    info!("  Health goals: {}", summary.health_goals);
    info!("  Products: {}", summary.products);
    info!("  Variants: {}", summary.variants);

    Ok(())
}

async fn write_catalog(
    tx: &mut Transaction<'_, Postgres>,
    seed: &CatalogSeed,
) -> Result<SeedSummary, sqlx::Error> {
    let mut summary = SeedSummary::default();

    let mut category_ids = HashMap::new();
    for category in &seed.categories {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, slug, description, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(&category.image_url)
        .fetch_one(&mut **tx)
        .await?;

        category_ids.insert(category.slug.as_str(), id);
        summary.categories += 1;
    }

    // Parents are linked once every category has an ID.
    for category in &seed.categories {
        let parent_id = category
            .parent
            .as_deref()
            .and_then(|slug| category_ids.get(slug).copied());

        sqlx::query("UPDATE categories SET parent_id = $1 WHERE slug = $2")
            .bind(parent_id)
            .bind(&category.slug)
            .execute(&mut **tx)
            .await?;
    }

    let mut brand_ids = HashMap::new();
    for brand in &seed.brands {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO brands (name, slug, description, logo_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                logo_url = EXCLUDED.logo_url,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&brand.name)
        .bind(&brand.slug)
        .bind(&brand.description)
        .bind(&brand.logo_url)
        .fetch_one(&mut **tx)
        .await?;

        brand_ids.insert(brand.slug.as_str(), id);
        summary.brands += 1;
    }

    let mut goal_ids = HashMap::new();
    for goal in &seed.health_goals {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO health_goals (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&goal.name)
        .bind(&goal.slug)
        .bind(&goal.description)
        .fetch_one(&mut **tx)
        .await?;

        goal_ids.insert(goal.slug.as_str(), id);
        summary.health_goals += 1;
    }

    for product in &seed.products {
        // Validation guarantees both references resolve.
        let category_id = category_ids.get(product.category.as_str()).copied();
        let brand_id = brand_ids.get(product.brand.as_str()).copied();

        let product_id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO products (
                name, slug, description, short_description, price, mrp,
                category_id, brand_id, stock_quantity, image_urls, weight, sku,
                nutrition_facts, ingredients, usage_instructions, form, is_featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                short_description = EXCLUDED.short_description,
                price = EXCLUDED.price,
                mrp = EXCLUDED.mrp,
                category_id = EXCLUDED.category_id,
                brand_id = EXCLUDED.brand_id,
                stock_quantity = EXCLUDED.stock_quantity,
                image_urls = EXCLUDED.image_urls,
                weight = EXCLUDED.weight,
                sku = EXCLUDED.sku,
                nutrition_facts = EXCLUDED.nutrition_facts,
                ingredients = EXCLUDED.ingredients,
                usage_instructions = EXCLUDED.usage_instructions,
                form = EXCLUDED.form,
                is_featured = EXCLUDED.is_featured,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.price)
        .bind(product.mrp)
        .bind(category_id)
        .bind(brand_id)
        .bind(product.stock_quantity)
        .bind(&product.image_urls)
        .bind(&product.weight)
        .bind(&product.sku)
        .bind(&product.nutrition_facts)
        .bind(&product.ingredients)
        .bind(&product.usage_instructions)
        .bind(&product.form)
        .bind(product.is_featured)
        .fetch_one(&mut **tx)
        .await?;
        summary.products += 1;

        for goal in &product.health_goals {
            sqlx::query(
                r"
                INSERT INTO product_health_goals (product_id, goal_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(product_id)
            .bind(goal_ids.get(goal.as_str()).copied())
            .execute(&mut **tx)
            .await?;
        }

        for variant in &product.variants {
            sqlx::query(
                r"
                INSERT INTO product_variants (product_id, name, sku, price, mrp, stock_quantity, weight)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (sku) DO UPDATE SET
                    product_id = EXCLUDED.product_id,
                    name = EXCLUDED.name,
                    price = EXCLUDED.price,
                    mrp = EXCLUDED.mrp,
                    stock_quantity = EXCLUDED.stock_quantity,
                    weight = EXCLUDED.weight,
                    updated_at = now()
                ",
            )
            .bind(product_id)
            .bind(&variant.name)
            .bind(&variant.sku)
            .bind(variant.price)
            .bind(variant.mrp)
            .bind(variant.stock_quantity)
            .bind(&variant.weight)
            .execute(&mut **tx)
            .await?;
            summary.variants += 1;
        }
    }

    Ok(summary)
}
