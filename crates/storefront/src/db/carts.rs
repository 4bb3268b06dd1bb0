//! Cart repository for database operations.
//!
//! Mutations that touch an existing line take the caller's [`Identity`] and
//! match it against the owning cart in the same statement, so a line is
//! never modified on behalf of someone who does not own it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use nutrishop_core::{
    CartId, CartItemId, Identity, OwnerColumnsError, Price, ProductId, VariantId,
};

use super::RepositoryError;
use crate::models::{Cart, CartItem, CartLine, LineProduct};

/// Columns returned for a `cart_items` row.
const ITEM_COLUMNS: &str =
    "cart_items.id, cart_items.cart_id, cart_items.product_id, cart_items.variant_id, \
     cart_items.quantity, cart_items.created_at, cart_items.updated_at";

/// Ownership predicate against `carts`, binding `$2` (user) and `$3` (guest).
const OWNED_BY: &str = "carts.user_id IS NOT DISTINCT FROM $2 \
     AND carts.guest_id IS NOT DISTINCT FROM $3";

/// Internal row type for `carts`.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<Uuid>,
    guest_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = Identity::from_owner_columns(row.user_id, row.guest_id.as_deref())
            .map_err(|e: OwnerColumnsError| {
                RepositoryError::DataCorruption(format!("cart {}: {e}", row.id))
            })?;

        Ok(Self {
            id: row.id,
            owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for a cart line joined with its product and variant.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
    product_name: String,
    product_slug: String,
    image_url: Option<String>,
    product_price: Price,
    product_mrp: Price,
    product_weight: Option<String>,
    variant_name: Option<String>,
    variant_price: Option<Price>,
    variant_mrp: Option<Price>,
    variant_weight: Option<String>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        // A line with a variant takes price, MRP and weight from the variant.
        let (price, mrp, weight) = match (row.variant_price, row.variant_mrp) {
            (Some(price), Some(mrp)) => (price, mrp, row.variant_weight),
            _ => (row.product_price, row.product_mrp, row.product_weight),
        };

        Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            product: LineProduct {
                id: row.product_id,
                name: row.product_name,
                slug: row.product_slug,
                price,
                mrp,
                image_url: row.image_url,
                weight,
                variant_name: row.variant_name,
            },
        }
    }
}

/// Internal row type for an upserted line.
#[derive(Debug, sqlx::FromRow)]
struct UpsertedItemRow {
    #[sqlx(flatten)]
    item: CartItem,
    inserted: bool,
}

/// Internal row type for an item together with its cart's owner columns.
#[derive(Debug, sqlx::FromRow)]
struct ItemOwnerRow {
    cart_id: CartId,
    user_id: Option<Uuid>,
    guest_id: Option<String>,
}

/// Result of adding a product to a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedItem {
    pub item: CartItem,
    /// `true` if a new line was created, `false` if an existing line grew.
    pub created: bool,
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the cart owned by `owner`, creating it if it does not exist.
    ///
    /// Concurrent first requests for the same owner converge on one cart:
    /// the insert conflicts on the owner's unique column and returns the
    /// existing row instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(&self, owner: &Identity) -> Result<Cart, RepositoryError> {
        let sql = match owner {
            Identity::Authenticated(_) => {
                r"
                INSERT INTO carts (user_id) VALUES ($1)
                ON CONFLICT (user_id) DO UPDATE SET updated_at = carts.updated_at
                RETURNING id, user_id, guest_id, created_at, updated_at
                "
            }
            Identity::Guest(_) => {
                r"
                INSERT INTO carts (guest_id) VALUES ($1)
                ON CONFLICT (guest_id) DO UPDATE SET updated_at = carts.updated_at
                RETURNING id, user_id, guest_id, created_at, updated_at
                "
            }
        };

        let query = sqlx::query_as::<_, CartRow>(sql);
        let query = match owner {
            Identity::Authenticated(user_id) => query.bind(user_id.as_uuid()),
            Identity::Guest(token) => query.bind(token.as_str()),
        };

        query.fetch_one(self.pool).await?.try_into()
    }

    /// Lines of a cart with product (and variant) details, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT cart_items.id, cart_items.product_id, cart_items.variant_id,
                   cart_items.quantity,
                   products.name AS product_name,
                   products.slug AS product_slug,
                   products.image_urls[1] AS image_url,
                   products.price AS product_price,
                   products.mrp AS product_mrp,
                   products.weight AS product_weight,
                   product_variants.name AS variant_name,
                   product_variants.price AS variant_price,
                   product_variants.mrp AS variant_mrp,
                   product_variants.weight AS variant_weight
            FROM cart_items
            JOIN products ON products.id = cart_items.product_id
            LEFT JOIN product_variants ON product_variants.id = cart_items.variant_id
            WHERE cart_items.cart_id = $1
            ORDER BY cart_items.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    /// Add `quantity` of a product (or variant) to a cart.
    ///
    /// Inserts a new line, or increments the existing line with the same
    /// `(product, variant)`. A missing variant only matches variant-less lines.
    ///
    /// Returns `None`, leaving the line untouched, if the merged quantity
    /// would exceed `max_quantity`. Both operands are at most `max_quantity`,
    /// so the sum cannot overflow.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the product or variant
    /// does not exist, `RepositoryError::Database` if the query fails.
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
        max_quantity: i32,
    ) -> Result<Option<UpsertedItem>, RepositoryError> {
        let row = sqlx::query_as::<_, UpsertedItemRow>(
            r"
            INSERT INTO cart_items (cart_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT cart_items_line_key DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity,
                    updated_at = now()
                WHERE cart_items.quantity + EXCLUDED.quantity <= $5
            RETURNING id, cart_id, product_id, variant_id, quantity, created_at, updated_at,
                      (xmax = 0) AS inserted
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .bind(max_quantity)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|row| UpsertedItem {
            item: row.item,
            created: row.inserted,
        }))
    }

    /// Set a line's quantity if the line belongs to `owner`'s cart.
    ///
    /// Returns `None` if no such line is owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity_owned(
        &self,
        item_id: CartItemId,
        owner: &Identity,
        quantity: i32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let (user_id, guest_id) = owner.owner_columns();
        let sql = format!(
            "UPDATE cart_items SET quantity = $4, updated_at = now() \
             FROM carts \
             WHERE cart_items.id = $1 AND carts.id = cart_items.cart_id AND {OWNED_BY} \
             RETURNING {ITEM_COLUMNS}"
        );

        let item = sqlx::query_as::<_, CartItem>(&sql)
            .bind(item_id)
            .bind(user_id)
            .bind(guest_id)
            .bind(quantity)
            .fetch_optional(self.pool)
            .await?;

        Ok(item)
    }

    /// Delete a line if it belongs to `owner`'s cart.
    ///
    /// Returns `false` if no such line is owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_owned(
        &self,
        item_id: CartItemId,
        owner: &Identity,
    ) -> Result<bool, RepositoryError> {
        let (user_id, guest_id) = owner.owner_columns();
        let sql = format!(
            "DELETE FROM cart_items USING carts \
             WHERE cart_items.id = $1 AND carts.id = cart_items.cart_id AND {OWNED_BY}"
        );

        let result = sqlx::query(&sql)
            .bind(item_id)
            .bind(user_id)
            .bind(guest_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Owner of the cart holding a line, if the line exists.
    ///
    /// Used after an owned mutation matched nothing, to tell a missing line
    /// from someone else's line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the cart's owner columns
    /// are invalid, `RepositoryError::Database` if the query fails.
    pub async fn item_owner(&self, item_id: CartItemId) -> Result<Option<Identity>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemOwnerRow>(
            r"
            SELECT carts.id AS cart_id, carts.user_id, carts.guest_id
            FROM cart_items
            JOIN carts ON carts.id = cart_items.cart_id
            WHERE cart_items.id = $1
            ",
        )
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|row| {
            Identity::from_owner_columns(row.user_id, row.guest_id.as_deref()).map_err(|e| {
                RepositoryError::DataCorruption(format!("cart {}: {e}", row.cart_id))
            })
        })
        .transpose()
    }
}
