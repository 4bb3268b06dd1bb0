//! SQL rendering for product listings.
//!
//! The page query and the count query both go through [`push_where`], so the
//! total always counts exactly the rows the pages are drawn from.

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use nutrishop_core::{HealthGoalId, PageRequest};

use super::filter::{LookupTable, ProductField, SortOrder};

/// Columns selected for a product listing row.
pub const PRODUCT_COLUMNS: &str = "products.id, products.name, products.slug, \
    products.description, products.short_description, products.price, products.mrp, \
    products.category_id, products.brand_id, products.stock_quantity, products.image_urls, \
    products.weight, products.sku, products.nutrition_facts, products.ingredients, \
    products.usage_instructions, products.form, products.is_featured, \
    products.created_at, products.updated_at";

/// A resolved filter, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `products.<fk> = id` for a resolved category or brand slug.
    References { table: LookupTable, id: i32 },
    /// Product is tagged with the goal.
    HealthGoal(HealthGoalId),
    /// Case-insensitive substring match. Holds the raw search text.
    Search(String),
    PriceRange {
        min: Option<Decimal>,
        max: Option<Decimal>,
    },
    ExactMatch { field: ProductField, value: String },
    Featured,
}

/// Escape `LIKE` metacharacters so user text matches literally.
#[must_use]
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append `WHERE ... AND ...` for `conditions` (nothing when empty).
pub fn push_where(query: &mut QueryBuilder<'_, Postgres>, conditions: &[Condition]) {
    for (i, condition) in conditions.iter().enumerate() {
        query.push(if i == 0 { " WHERE " } else { " AND " });
        push_condition(query, condition);
    }
}

fn push_condition(query: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    match condition {
        Condition::References { table, id } => {
            query.push(table.product_column()).push(" = ").push_bind(*id);
        }
        Condition::HealthGoal(goal_id) => {
            query
                .push(
                    "products.id IN (SELECT product_health_goals.product_id \
                     FROM product_health_goals WHERE product_health_goals.goal_id = ",
                )
                .push_bind(*goal_id)
                .push(")");
        }
        Condition::Search(text) => {
            let pattern = format!("%{}%", escape_like(text));
            query
                .push("(products.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR products.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR products.short_description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        Condition::PriceRange { min, max } => match (min, max) {
            (Some(min), Some(max)) => {
                query
                    .push("products.price BETWEEN ")
                    .push_bind(*min)
                    .push(" AND ")
                    .push_bind(*max);
            }
            (Some(min), None) => {
                query.push("products.price >= ").push_bind(*min);
            }
            (None, Some(max)) => {
                query.push("products.price <= ").push_bind(*max);
            }
            (None, None) => {
                query.push("TRUE");
            }
        },
        Condition::ExactMatch { field, value } => {
            query.push(field.column()).push(" = ").push_bind(value.clone());
        }
        Condition::Featured => {
            query.push("products.is_featured");
        }
    }
}

/// Build the paginated listing query.
#[must_use]
pub fn list_query(
    conditions: &[Condition],
    sort: SortOrder,
    page: PageRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
    push_where(&mut query, conditions);
    query
        .push(" ORDER BY ")
        .push(sort.order_by())
        .push(" LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
    query
}

/// Build the count query over the same conditions.
#[must_use]
pub fn count_query(conditions: &[Condition]) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT COUNT(*) FROM products");
    push_where(&mut query, conditions);
    query
}
