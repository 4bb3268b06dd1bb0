//! Cart operations for users and guests.
//!
//! Carts are created lazily the first time an owner touches them. Adding a
//! product that is already in the cart grows the existing line; setting a
//! line's quantity to zero or below removes it.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use nutrishop_core::{CartItemId, Identity, ProductId, VariantId};

use crate::db::carts::UpsertedItem;
use crate::db::{CartRepository, CatalogRepository, RepositoryError, retry_read};
use crate::error::add_breadcrumb;
use crate::models::{CartItem, CartView};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product to add does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The variant to add does not exist.
    #[error("variant not found")]
    VariantNotFound,

    /// The variant belongs to a different product.
    #[error("variant {variant_id} does not belong to product {product_id}")]
    VariantMismatch {
        product_id: ProductId,
        variant_id: VariantId,
    },

    /// The line would hold more than [`MAX_LINE_QUANTITY`].
    #[error("quantity exceeds {}", MAX_LINE_QUANTITY)]
    QuantityLimit,

    /// No cart line with this ID exists.
    #[error("cart item not found")]
    ItemNotFound,

    /// The cart line belongs to someone else's cart.
    #[error("cart item belongs to another cart")]
    NotOwner,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A request to add a product to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// At least 1; enforced by the caller. The upper bound is checked here.
    pub quantity: i32,
}

/// What a quantity update does to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Delete the line.
    Remove,
    /// Set the line to exactly this quantity.
    Set(i32),
}

impl From<i32> for QuantityChange {
    fn from(quantity: i32) -> Self {
        if quantity <= 0 {
            Self::Remove
        } else {
            Self::Set(quantity)
        }
    }
}

/// Outcome of a quantity update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityUpdate {
    Updated(CartItem),
    Removed,
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    catalog: CatalogRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            catalog: CatalogRepository::new(pool),
        }
    }

    /// The owner's cart with lines and totals, creating an empty cart if
    /// the owner has none.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn view(&self, owner: &Identity) -> Result<CartView, CartError> {
        let cart = self.carts.resolve(owner).await?;

        let carts = &self.carts;
        let lines = retry_read(move || carts.lines(cart.id)).await?;

        Ok(CartView::new(cart.id, lines))
    }

    /// Add a product (or one of its variants) to the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityLimit` if the line would exceed
    /// [`MAX_LINE_QUANTITY`], `CartError::ProductNotFound` /
    /// `CartError::VariantNotFound` for unknown IDs,
    /// `CartError::VariantMismatch` if the variant belongs to another
    /// product, `CartError::Repository` if a query fails.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn add_item(&self, owner: &Identity, add: AddItem) -> Result<UpsertedItem, CartError> {
        check_line_quantity(add.quantity)?;
        self.check_purchasable(add.product_id, add.variant_id).await?;

        let cart = self.carts.resolve(owner).await?;
        let upserted = self
            .carts
            .add_item(
                cart.id,
                add.product_id,
                add.variant_id,
                add.quantity,
                MAX_LINE_QUANTITY,
            )
            .await
            .map_err(|e| match e {
                // Product or variant deleted since the check above.
                RepositoryError::InvalidReference(_) => CartError::ProductNotFound,
                other => CartError::Repository(other),
            })?
            .ok_or(CartError::QuantityLimit)?;

        info!(
            cart_id = %cart.id,
            cart_item_id = %upserted.item.id,
            quantity = upserted.item.quantity,
            created = upserted.created,
            "Item added to cart"
        );
        let product_id = add.product_id.to_string();
        add_breadcrumb(
            "cart",
            "Added item to cart",
            Some(&[("product_id", product_id.as_str())]),
        );

        Ok(upserted)
    }

    /// Set a line's quantity; zero or below removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityLimit` above [`MAX_LINE_QUANTITY`],
    /// `CartError::ItemNotFound` if the line does not exist,
    /// `CartError::NotOwner` if it is in someone else's cart,
    /// `CartError::Repository` if a query fails.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn update_quantity(
        &self,
        owner: &Identity,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<QuantityUpdate, CartError> {
        match QuantityChange::from(quantity) {
            QuantityChange::Remove => {
                self.remove_item(owner, item_id).await?;
                Ok(QuantityUpdate::Removed)
            }
            QuantityChange::Set(quantity) => {
                check_line_quantity(quantity)?;
                match self.carts.set_quantity_owned(item_id, owner, quantity).await? {
                    Some(item) => {
                        info!(cart_item_id = %item.id, quantity, "Cart item quantity updated");
                        Ok(QuantityUpdate::Updated(item))
                    }
                    None => Err(self.explain_miss(owner, item_id).await),
                }
            }
        }
    }

    /// Remove a line from the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line does not exist,
    /// `CartError::NotOwner` if it is in someone else's cart,
    /// `CartError::Repository` if a query fails.
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn remove_item(&self, owner: &Identity, item_id: CartItemId) -> Result<(), CartError> {
        if self.carts.delete_owned(item_id, owner).await? {
            info!(cart_item_id = %item_id, "Cart item removed");
            Ok(())
        } else {
            Err(self.explain_miss(owner, item_id).await)
        }
    }

    /// Verify the product exists and, if given, the variant belongs to it.
    async fn check_purchasable(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<(), CartError> {
        let catalog = &self.catalog;

        let Some(variant_id) = variant_id else {
            return if retry_read(move || catalog.product_exists(product_id)).await? {
                Ok(())
            } else {
                Err(CartError::ProductNotFound)
            };
        };

        match retry_read(move || catalog.variant_product(variant_id)).await? {
            None => Err(CartError::VariantNotFound),
            Some(owner_product) if owner_product == product_id => Ok(()),
            Some(_) => Err(CartError::VariantMismatch {
                product_id,
                variant_id,
            }),
        }
    }

    /// Work out why an owned mutation matched no line.
    async fn explain_miss(&self, caller: &Identity, item_id: CartItemId) -> CartError {
        match self.carts.item_owner(item_id).await {
            Ok(Some(owner)) if !caller.owns(&owner) => {
                warn!(cart_item_id = %item_id, "Attempt to modify another owner's cart item");
                CartError::NotOwner
            }
            // Missing, or removed concurrently by its owner.
            Ok(_) => CartError::ItemNotFound,
            Err(e) => CartError::Repository(e),
        }
    }
}

/// Reject quantities above [`MAX_LINE_QUANTITY`] before touching storage.
const fn check_line_quantity(quantity: i32) -> Result<(), CartError> {
    if quantity > MAX_LINE_QUANTITY {
        Err(CartError::QuantityLimit)
    } else {
        Ok(())
    }
}
