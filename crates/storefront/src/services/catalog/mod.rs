//! Catalog browsing: reference data, product listings and product pages.
//!
//! Listing flow:
//!
//! 1. [`filter`] parses query options into a [`ProductFilter`]
//! 2. [`CatalogService::list_products`] resolves slug predicates into
//!    [`Condition`]s (an unknown slug short-circuits to an empty page)
//! 3. [`query`] renders the same conditions into the page and count queries

pub mod filter;
pub mod query;

use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use nutrishop_core::{PageInfo, PageRequest};

use crate::db::{CatalogRepository, RepositoryError, retry_read};
use crate::models::{Brand, Category, CategoryNode, HealthGoal, Product, ProductDetail, Review};

pub use filter::{FilterError, ProductFilter, ProductListParams};
use filter::Predicate;
use query::Condition;

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub info: PageInfo,
}

impl ProductPage {
    fn empty(page: PageRequest) -> Self {
        Self {
            products: Vec::new(),
            info: PageInfo::empty(page),
        }
    }
}

/// Read-only catalog operations.
pub struct CatalogService<'a> {
    repo: CatalogRepository<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
        }
    }

    /// Root categories, each with its direct children.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>, RepositoryError> {
        let repo = &self.repo;
        let categories = retry_read(move || repo.categories()).await?;
        Ok(build_category_tree(categories))
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let repo = &self.repo;
        retry_read(move || repo.brands()).await
    }

    /// All health goals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn health_goals(&self) -> Result<Vec<HealthGoal>, RepositoryError> {
        let repo = &self.repo;
        retry_read(move || repo.health_goals()).await
    }

    /// One page of products matching `filter`, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, RepositoryError> {
        let Some(conditions) = self.resolve(&filter.predicates).await? else {
            tracing::debug!("Listing filter references an unknown slug");
            return Ok(ProductPage::empty(filter.page));
        };

        let repo = &self.repo;
        let conditions = conditions.as_slice();
        let (sort, page) = (filter.sort, filter.page);

        let (products, total) =
            retry_read(move || repo.product_page(conditions, sort, page)).await?;

        Ok(ProductPage {
            products,
            info: PageInfo::new(page, total),
        })
    }

    /// Product page for `slug`, or `None` if no product has that slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn product_detail(&self, slug: &str) -> Result<Option<ProductDetail>, RepositoryError> {
        let repo = &self.repo;

        let Some(product) = retry_read(move || repo.product_by_slug(slug)).await? else {
            return Ok(None);
        };

        let (product_id, brand_id, category_id) = (product.id, product.brand_id, product.category_id);
        let variants = retry_read(move || repo.variants_for(product_id)).await?;
        let brand = retry_read(move || repo.brand(brand_id)).await?;
        let category = retry_read(move || repo.category(category_id)).await?;
        let reviews = retry_read(move || repo.reviews_for(product_id)).await?;

        Ok(Some(ProductDetail {
            product,
            variants,
            brand,
            category,
            average_rating: average_rating(&reviews),
            review_count: reviews.len(),
            reviews,
        }))
    }

    /// Resolve slug predicates to IDs.
    ///
    /// Returns `None` if any slug matches nothing, since the AND of the
    /// filters can then match no product.
    async fn resolve(
        &self,
        predicates: &[Predicate],
    ) -> Result<Option<Vec<Condition>>, RepositoryError> {
        let repo = &self.repo;
        let mut conditions = Vec::with_capacity(predicates.len());

        for predicate in predicates {
            let condition = match predicate {
                Predicate::SlugLookup { table, slug } => {
                    let table = *table;
                    match retry_read(move || repo.id_for_slug(table, slug)).await? {
                        Some(id) => Condition::References { table, id },
                        None => return Ok(None),
                    }
                }
                Predicate::HealthGoal(slug) => {
                    match retry_read(move || repo.health_goal_id(slug)).await? {
                        Some(id) => Condition::HealthGoal(id),
                        None => return Ok(None),
                    }
                }
                Predicate::Search(text) => Condition::Search(text.clone()),
                Predicate::PriceRange { min, max } => Condition::PriceRange {
                    min: *min,
                    max: *max,
                },
                Predicate::ExactMatch { field, value } => Condition::ExactMatch {
                    field: *field,
                    value: value.clone(),
                },
                Predicate::Featured => Condition::Featured,
            };
            conditions.push(condition);
        }

        Ok(Some(conditions))
    }
}

/// Group categories into roots with their direct children.
///
/// Roots keep their input order. Categories nested more than one level deep
/// are not listed.
#[must_use]
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let (roots, children): (Vec<_>, Vec<_>) =
        categories.into_iter().partition(|c| c.parent_id.is_none());

    roots
        .into_iter()
        .map(|root| {
            let children = children
                .iter()
                .filter(|child| child.parent_id == Some(root.id))
                .cloned()
                .collect();
            CategoryNode {
                category: root,
                children,
            }
        })
        .collect()
}

/// Mean rating, or 0 when there are no reviews.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    total as f64 / reviews.len() as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use nutrishop_core::{CategoryId, ProductId, ReviewId};

    use super::*;

    fn category(id: i32, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            description: None,
            image_url: None,
            parent_id: parent.map(CategoryId::new),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn review(rating: i32) -> Review {
        Review {
            id: ReviewId::new(rating),
            product_id: ProductId::new(1),
            user_id: Uuid::new_v4(),
            rating,
            review_text: None,
            is_verified_purchase: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_category_tree_groups_children() {
        let tree = build_category_tree(vec![
            category(1, None),
            category(2, Some(1)),
            category(3, None),
            category(4, Some(1)),
            category(5, Some(3)),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, CategoryId::new(1));
        assert_eq!(
            tree[0].children.iter().map(|c| c.id.as_i32()).collect::<Vec<_>>(),
            vec![2, 4]
        );
        assert_eq!(tree[1].category.id, CategoryId::new(3));
        assert_eq!(tree[1].children.len(), 1);
    }

    #[test]
    fn test_category_tree_omits_grandchildren() {
        let tree = build_category_tree(vec![
            category(1, None),
            category(2, Some(1)),
            category(3, Some(2)),
        ]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, CategoryId::new(2));
    }

    #[test]
    fn test_category_node_serializes_flat() {
        let tree = build_category_tree(vec![category(1, None), category(2, Some(1))]);
        let json = serde_json::to_value(&tree[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["slug"], "category-1");
        assert_eq!(json["parentId"], serde_json::Value::Null);
        assert_eq!(json["children"][0]["parentId"], 1);
    }

    #[test]
    fn test_average_rating() {
        assert!((average_rating(&[]) - 0.0).abs() < f64::EPSILON);
        assert!((average_rating(&[review(5), review(4)]) - 4.5).abs() < f64::EPSILON);
        assert!((average_rating(&[review(1), review(2), review(2)]) - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_page_serializes() {
        let page = ProductPage::empty(PageRequest::new(2, 12).unwrap());
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["products"], serde_json::json!([]));
        assert_eq!(json["page"], 2);
        assert_eq!(json["totalPages"], 0);
        assert_eq!(json["totalProducts"], 0);
    }
}
