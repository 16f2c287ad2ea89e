//! # Cart
//!
//! The active order: ordered lines, each a frozen snapshot of a product or
//! variant at the moment it was first added.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operator Action          Cart Method             Stock Gate            │
//! │  ───────────────          ───────────             ──────────            │
//! │                                                                         │
//! │  Pick product/variant ──► add_item() ───────────► stock > 0, qty+1 ≤    │
//! │                                                   stock                 │
//! │  +/- on a line ─────────► change_quantity() ────► 1 ≤ qty ≤ stock       │
//! │                                                                         │
//! │  Remove ────────────────► remove_item() ────────► (none)                │
//! │                                                                         │
//! │  Pend / Pay ────────────► snapshot() + clear()                          │
//! │                                                                         │
//! │  Resume ────────────────► restore(snapshot)                             │
//! │                                                                         │
//! │  NOTE: every failed mutation leaves the cart exactly as it was.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::catalog::{Catalog, ItemKey};
use crate::error::{EngineError, EngineResult};
use crate::money::Money;
use crate::types::{Attributes, Product, Variant};

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart.
///
/// ## Design Notes
/// Price, SKU, name and category are frozen when the line is created. A
/// later catalog price change does not reach a line already in the cart;
/// merging more units into the line keeps the original price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    /// `None` for products sold without variants.
    pub variant_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub category: String,
    /// Price in minor units at time of first addition (frozen).
    pub unit_price_cents: i64,
    /// Always ≥ 1.
    pub quantity: i64,
    /// Attributes of the selected variant; empty for plain products.
    pub attributes: Attributes,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// A fresh line with quantity 1 and the current price frozen in.
    fn first_unit(product: &Product, variant: Option<&Variant>) -> Self {
        match variant {
            Some(variant) => CartLine {
                product_id: product.id.clone(),
                variant_id: Some(variant.id.clone()),
                sku: variant.sku.clone(),
                name: variant.name.clone(),
                category: product.category.clone(),
                unit_price_cents: variant.price_cents,
                quantity: 1,
                attributes: variant.attributes.clone(),
                added_at: Utc::now(),
            },
            None => CartLine {
                product_id: product.id.clone(),
                variant_id: None,
                sku: product.sku.clone(),
                name: product.name.clone(),
                category: product.category.clone(),
                unit_price_cents: product.base_price_cents,
                quantity: 1,
                attributes: Attributes::new(),
                added_at: Utc::now(),
            },
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.product_id, self.variant_id.as_deref())
    }

    /// True when this line holds `product_id` / `variant_id`.
    pub fn is(&self, product_id: &str, variant_id: Option<&str>) -> bool {
        self.product_id == product_id && self.variant_id.as_deref() == variant_id
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart Snapshot
// =============================================================================

/// An immutable, order-preserving copy of the cart's lines.
///
/// Handed to the suspension store and the recorder; never aliases the live
/// cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn new(lines: Vec<CartLine>) -> Self {
        CartSnapshot { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The active order.
///
/// ## Invariants
/// - Lines are unique by (product id, variant id)
/// - Every quantity is ≥ 1 and never exceeds the stock seen when it was set
/// - Lines keep insertion order; merging keeps the original position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    /// When the cart was created or last cleared.
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of a product, or of one of its variants.
    ///
    /// `product` must come from a catalog snapshot read just before the
    /// call; its stock figures are the ones enforced.
    ///
    /// ## Errors
    /// - `VariantRequired`: product has variants, none given
    /// - `UnknownVariant`: variant not one of the product's own
    /// - `OutOfStock`: effective stock ≤ 0
    /// - `StockExceeded`: the line already holds every unit in stock
    pub fn add_item(&mut self, product: &Product, variant: Option<&Variant>) -> EngineResult<()> {
        let variant = match (product.has_variants, variant) {
            (true, None) => {
                return Err(EngineError::VariantRequired {
                    product_id: product.id.clone(),
                })
            }
            (true, Some(v)) if product.variant(&v.id).is_some() => Some(v),
            (_, Some(v)) => {
                return Err(EngineError::UnknownVariant {
                    product_id: product.id.clone(),
                    variant_id: v.id.clone(),
                })
            }
            (false, None) => None,
        };

        let stock = product.effective_stock(variant);
        let sku = variant.map_or(&product.sku, |v| &v.sku);
        if stock <= 0 {
            return Err(EngineError::OutOfStock { sku: sku.clone() });
        }

        let variant_id = variant.map(|v| v.id.as_str());
        if let Some(line) = self.line_mut(&product.id, variant_id) {
            let requested = line.quantity + 1;
            if requested > stock {
                return Err(EngineError::StockExceeded {
                    sku: sku.clone(),
                    available: stock,
                    requested,
                });
            }
            line.quantity = requested;
            return Ok(());
        }

        self.lines.push(CartLine::first_unit(product, variant));
        Ok(())
    }

    /// Adjusts a line's quantity by `delta`.
    ///
    /// ## Behavior
    /// - Line absent or `delta == 0`: no-op
    /// - Resulting quantity ≤ 0: no-op, the line stays (use `remove_item`)
    /// - A delta that overflows counts as `i64::MAX` upward and as ≤ 0 downward
    /// - Resulting quantity above the stock in `catalog`: `StockExceeded`,
    ///   line unchanged. A unit no longer in the catalog counts as stock 0.
    pub fn change_quantity(
        &mut self,
        catalog: &Catalog,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
    ) -> EngineResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let Some(line) = self.line_mut(product_id, variant_id) else {
            return Ok(());
        };

        // Overflow past i64::MAX can never fit in stock; past i64::MIN is a
        // decrease below zero.
        let requested = match line.quantity.checked_add(delta) {
            Some(requested) => requested,
            None if delta > 0 => i64::MAX,
            None => return Ok(()),
        };
        if requested <= 0 {
            return Ok(());
        }

        let available = catalog.effective_stock(product_id, variant_id).unwrap_or(0);
        if requested > available {
            return Err(EngineError::StockExceeded {
                sku: line.sku.clone(),
                available,
                requested,
            });
        }

        line.quantity = requested;
        Ok(())
    }

    /// Removes a line. No-op if absent.
    pub fn remove_item(&mut self, product_id: &str, variant_id: Option<&str>) {
        self.lines.retain(|l| !l.is(product_id, variant_id));
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Copies the current lines out.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::new(self.lines.clone())
    }

    /// Replaces the cart's contents with a resumed snapshot.
    pub fn restore(&mut self, snapshot: CartSnapshot) {
        self.lines = snapshot.into_lines();
        self.created_at = Utc::now();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str, variant_id: Option<&str>) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.is(product_id, variant_id))
    }

    fn line_mut(&mut self, product_id: &str, variant_id: Option<&str>) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.is(product_id, variant_id))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
