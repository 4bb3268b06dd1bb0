//! Catalog repository: reference data, product lookups and listings.
//!
//! Every method here is a read, so the service layer may wrap any of them
//! in [`super::retry_read`].

use sqlx::PgPool;

use nutrishop_core::{BrandId, CategoryId, HealthGoalId, PageRequest, ProductId, VariantId};

use super::RepositoryError;
use crate::models::{Brand, Category, HealthGoal, Product, ProductVariant, Review};
use crate::services::catalog::filter::{LookupTable, SortOrder};
use crate::services::catalog::query::{self, Condition, PRODUCT_COLUMNS};

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every category, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, parent_id, created_at, updated_at
            FROM categories
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// List every brand, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let brands = sqlx::query_as::<_, Brand>(
            r"
            SELECT id, name, slug, description, logo_url, created_at, updated_at
            FROM brands
            ORDER BY name, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(brands)
    }

    /// List every health goal, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn health_goals(&self) -> Result<Vec<HealthGoal>, RepositoryError> {
        let goals = sqlx::query_as::<_, HealthGoal>(
            r"
            SELECT id, name, slug, description, created_at, updated_at
            FROM health_goals
            ORDER BY name, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(goals)
    }

    /// Resolve a category or brand slug to its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_for_slug(
        &self,
        table: LookupTable,
        slug: &str,
    ) -> Result<Option<i32>, RepositoryError> {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT id FROM {} WHERE slug = $1", table.table());
        let id = sqlx::query_scalar::<_, i32>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// Resolve a health goal slug to its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn health_goal_id(&self, slug: &str) -> Result<Option<HealthGoalId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, HealthGoalId>("SELECT id FROM health_goals WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(id)
    }

    /// Fetch one page of products matching `conditions` together with the
    /// number of matches ignoring pagination.
    ///
    /// Both statements run in one read-only `REPEATABLE READ` transaction,
    /// so the total always agrees with the rows returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn product_page(
        &self,
        conditions: &[Condition],
        sort: SortOrder,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let products = query::list_query(conditions, sort, page)
            .build_query_as::<Product>()
            .fetch_all(&mut *tx)
            .await?;

        let total = query::count_query(conditions)
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((products, total))
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE products.slug = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }

    /// Whether a product with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_exists(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Variants of a product, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants_for(&self, id: ProductId) -> Result<Vec<ProductVariant>, RepositoryError> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r"
            SELECT id, product_id, name, price, mrp, stock_quantity, weight, sku,
                   created_at, updated_at
            FROM product_variants
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(variants)
    }

    /// The product a variant belongs to, if the variant exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_product(&self, id: VariantId) -> Result<Option<ProductId>, RepositoryError> {
        let product_id = sqlx::query_scalar::<_, ProductId>(
            "SELECT product_id FROM product_variants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product_id)
    }

    /// Get a brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brand(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(
            r"
            SELECT id, name, slug, description, logo_url, created_at, updated_at
            FROM brands
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(brand)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT id, name, slug, description, image_url, parent_id, created_at, updated_at
            FROM categories
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reviews_for(&self, id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            r"
            SELECT id, product_id, user_id, rating, review_text, is_verified_purchase,
                   created_at, updated_at
            FROM reviews
            WHERE product_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }
}
