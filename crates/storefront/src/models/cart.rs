//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use nutrishop_core::{CartId, CartItemId, Identity, Price, ProductId, VariantId};

/// A shopping cart (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    /// The user or guest this cart belongs to.
    pub owner: Identity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored cart line as written by add/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the product details shown in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i32,
    pub product: LineProduct,
}

/// Product details for a cart line.
///
/// Price, MRP and weight come from the variant when the line has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    pub mrp: Price,
    /// First product image, if any.
    pub image_url: Option<String>,
    pub weight: Option<String>,
    pub variant_name: Option<String>,
}

impl CartLine {
    /// Selling price of this line.
    #[must_use]
    pub fn amount(&self) -> Price {
        self.product.price.line_total(self.quantity)
    }

    /// List price of this line.
    #[must_use]
    pub fn mrp_amount(&self) -> Price {
        self.product.mrp.line_total(self.quantity)
    }
}

/// Cart totals, serialized as JSON numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_mrp: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    /// Number of distinct lines, not the summed quantity.
    pub item_count: usize,
}

impl CartTotals {
    /// Compute totals over a cart's lines.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let total_amount: Price = lines.iter().map(CartLine::amount).sum();
        let total_mrp: Price = lines.iter().map(CartLine::mrp_amount).sum();

        Self {
            total_amount: total_amount.amount(),
            total_mrp: total_mrp.amount(),
            discount: (total_mrp - total_amount).amount(),
            item_count: lines.len(),
        }
    }
}

/// A cart with its lines and totals, as returned by `GET /api/cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub items: Vec<CartLine>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

impl CartView {
    #[must_use]
    pub fn new(id: CartId, items: Vec<CartLine>) -> Self {
        let totals = CartTotals::from_lines(&items);
        Self { id, items, totals }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap())
    }

    fn line(id: i32, price_str: &str, mrp_str: &str, quantity: i32) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            variant_id: None,
            quantity,
            product: LineProduct {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                slug: format!("product-{id}"),
                price: price(price_str),
                mrp: price(mrp_str),
                image_url: None,
                weight: None,
                variant_name: None,
            },
        }
    }

    #[test]
    fn test_empty_cart_totals() {
        let totals = CartTotals::from_lines(&[]);
        assert_eq!(totals.total_amount, Decimal::ZERO);
        assert_eq!(totals.total_mrp, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.item_count, 0);
    }

    #[test]
    fn test_totals_and_discount() {
        // 2 x 1499 (mrp 1999) + 1 x 799 (mrp 799)
        let lines = [line(1, "1499.00", "1999.00", 2), line(2, "799.00", "799.00", 1)];
        let totals = CartTotals::from_lines(&lines);

        assert_eq!(totals.total_amount, Decimal::from_str("3797.00").unwrap());
        assert_eq!(totals.total_mrp, Decimal::from_str("4797.00").unwrap());
        assert_eq!(totals.discount, Decimal::from_str("1000.00").unwrap());
    }

    #[test]
    fn test_item_count_is_line_count() {
        let lines = [line(1, "10.00", "10.00", 5), line(2, "10.00", "10.00", 3)];
        assert_eq!(CartTotals::from_lines(&lines).item_count, 2);
    }

    #[test]
    fn test_totals_are_exact() {
        let lines = [line(1, "0.10", "0.10", 1), line(2, "0.20", "0.20", 1)];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.total_amount, Decimal::from_str("0.30").unwrap());
    }

    #[test]
    fn test_view_serializes_totals_as_numbers() {
        let view = CartView::new(CartId::new(3), vec![line(1, "249.50", "300.00", 2)]);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["totalAmount"].as_f64(), Some(499.0));
        assert_eq!(json["totalMrp"].as_f64(), Some(600.0));
        assert_eq!(json["discount"].as_f64(), Some(101.0));
        assert_eq!(json["itemCount"], 1);
        assert_eq!(json["items"][0]["product"]["price"], "249.50");
        assert_eq!(json["items"][0]["productId"], 1);
    }
}
