//! # Catalog Snapshot
//!
//! An immutable view of products, variants and stock levels, handed to the
//! engine by the catalog collaborator.
//!
//! ## Snapshot Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CatalogStore::snapshot() ──► Catalog (validated, read-only)            │
//! │        │                          │                                     │
//! │        │                          ├──► variant resolver                 │
//! │        │                          └──► cart stock gates                 │
//! │        │                                                                │
//! │        └── re-read before EVERY cart mutation, so a unit sold by        │
//! │            another terminal is seen on the next attempt                 │
//! │                                                                         │
//! │  The only write path is CatalogStore::decrement_stock() at finalize.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Product, Variant};
use crate::validation::{validate_product, ValidationResult};

// =============================================================================
// Item Key
// =============================================================================

/// Identity of a sellable unit: a product, or one variant of a product.
///
/// This is both the cart-line identity (two adds of the same key merge) and
/// the key of the catalog's stock record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub product_id: String,
    pub variant_id: Option<String>,
}

impl ItemKey {
    pub fn new(product_id: impl Into<String>, variant_id: Option<impl Into<String>>) -> Self {
        ItemKey {
            product_id: product_id.into(),
            variant_id: variant_id.map(Into::into),
        }
    }

    /// Key of a product sold without variants.
    pub fn product(product_id: impl Into<String>) -> Self {
        ItemKey {
            product_id: product_id.into(),
            variant_id: None,
        }
    }

    /// Key of one variant.
    pub fn variant(product_id: impl Into<String>, variant_id: impl Into<String>) -> Self {
        ItemKey {
            product_id: product_id.into(),
            variant_id: Some(variant_id.into()),
        }
    }

    /// True when this key names `product_id` and `variant_id`.
    pub fn is(&self, product_id: &str, variant_id: Option<&str>) -> bool {
        self.product_id == product_id && self.variant_id.as_deref() == variant_id
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant_id {
            Some(variant_id) => write!(f, "{}/{}", self.product_id, variant_id),
            None => f.write_str(&self.product_id),
        }
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// One row of the low-stock listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub key: ItemKey,
    pub sku: String,
    pub name: String,
    pub stock_quantity: i64,
    pub reorder_point: i64,
}

// =============================================================================
// Catalog
// =============================================================================

/// A validated, immutable catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Products in catalog order.
    products: Vec<Product>,
    /// Product id → position in `products`.
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a snapshot, validating every product.
    ///
    /// ## Errors
    /// - Any product invariant violation (see [`validate_product`])
    /// - Two products sharing an id
    pub fn new(products: Vec<Product>) -> ValidationResult<Catalog> {
        let mut index = HashMap::with_capacity(products.len());

        for (position, product) in products.iter().enumerate() {
            validate_product(product)?;
            if index.insert(product.id.clone(), position).is_some() {
                return Err(ValidationError::Duplicate {
                    field: "product id".to_string(),
                    value: product.id.clone(),
                });
            }
        }

        Ok(Catalog { products, index })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// All products in catalog order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.index
            .get(product_id)
            .and_then(|&position| self.products.get(position))
    }

    pub fn variant(&self, product_id: &str, variant_id: &str) -> Option<&Variant> {
        self.product(product_id)?.variant(variant_id)
    }

    /// Current stock of a sellable unit, or `None` if the catalog no longer
    /// has it.
    pub fn effective_stock(&self, product_id: &str, variant_id: Option<&str>) -> Option<i64> {
        let product = self.product(product_id)?;
        match variant_id {
            Some(variant_id) => product.variant(variant_id).map(|v| v.stock_quantity),
            None => Some(product.stock_quantity),
        }
    }

    /// Case-insensitive substring search over name and SKU.
    ///
    /// An empty query returns every product.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.sku.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Sellable units at or below `threshold`, in catalog order.
    ///
    /// Products with variants are reported per variant; their own stock
    /// figure is ignored.
    pub fn low_stock(&self, threshold: i64) -> Vec<StockLevel> {
        self.levels_at_or_below(|_| threshold)
    }

    /// Sellable units at or below their product's reorder point.
    pub fn needs_reorder(&self) -> Vec<StockLevel> {
        self.levels_at_or_below(|product| product.reorder_point)
    }

    fn levels_at_or_below(&self, limit: impl Fn(&Product) -> i64) -> Vec<StockLevel> {
        let mut levels = Vec::new();

        for product in &self.products {
            let at_most = limit(product);
            let level = |key: ItemKey, sku: &str, name: &str, stock_quantity: i64| StockLevel {
                key,
                sku: sku.to_string(),
                name: name.to_string(),
                stock_quantity,
                reorder_point: product.reorder_point,
            };

            if product.has_variants {
                levels.extend(
                    product
                        .variants
                        .iter()
                        .filter(|v| v.stock_quantity <= at_most)
                        .map(|v| {
                            level(
                                ItemKey::variant(&product.id, &v.id),
                                &v.sku,
                                &v.name,
                                v.stock_quantity,
                            )
                        }),
                );
            } else if product.stock_quantity <= at_most {
                levels.push(level(
                    ItemKey::product(&product.id),
                    &product.sku,
                    &product.name,
                    product.stock_quantity,
                ));
            }
        }

        levels
    }

    /// Products whose expiry date is on or before `date`.
    pub fn expiring_on_or_before(&self, date: NaiveDate) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| p.is_expired_on(date))
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Attributes;

    pub(crate) fn tshirt_variant(id: &str, color: &str, size: &str, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            name: format!("T-Shirt - {color}, {size}"),
            sku: format!("CLOTH001-{}-{}", &color[..1], size),
            price_cents: 1999,
            stock_quantity: stock,
            attributes: Attributes::from([
                ("color".to_string(), color.to_string()),
                ("size".to_string(), size.to_string()),
            ]),
        }
    }

    /// The demo T-Shirt: Red/Blue × S/M at 19.99.
    pub(crate) fn tshirt() -> Product {
        Product {
            id: "1".to_string(),
            name: "T-Shirt".to_string(),
            base_price_cents: 1999,
            sku: "CLOTH001".to_string(),
            category: "Clothing".to_string(),
            stock_quantity: 100,
            reorder_point: 20,
            expiry_date: None,
            has_variants: true,
            variants: vec![
                tshirt_variant("1-1", "Red", "S", 20),
                tshirt_variant("1-2", "Red", "M", 30),
                tshirt_variant("1-3", "Blue", "S", 25),
                tshirt_variant("1-4", "Blue", "M", 25),
            ],
        }
    }

    pub(crate) fn plain(id: &str, name: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            base_price_cents: price_cents,
            sku: format!("SKU-{id}"),
            category: "Grocery".to_string(),
            stock_quantity: stock,
            reorder_point: 0,
            expiry_date: None,
            has_variants: false,
            variants: Vec::new(),
        }
    }

    pub(crate) fn demo_catalog() -> Catalog {
        Catalog::new(vec![tshirt(), plain("2", "Fresh Milk", 349, 50)]).unwrap()
    }

    #[test]
    fn test_lookup_and_effective_stock() {
        let catalog = demo_catalog();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.product("2").unwrap().name, "Fresh Milk");
        assert_eq!(catalog.variant("1", "1-3").unwrap().stock_quantity, 25);
        assert_eq!(catalog.effective_stock("1", Some("1-1")), Some(20));
        assert_eq!(catalog.effective_stock("2", None), Some(50));
        assert_eq!(catalog.effective_stock("1", Some("9-9")), None);
        assert_eq!(catalog.effective_stock("404", None), None);
    }

    #[test]
    fn test_duplicate_product_ids_rejected() {
        let result = Catalog::new(vec![plain("2", "Milk", 349, 1), plain("2", "Milk", 349, 1)]);
        assert!(matches!(result, Err(ValidationError::Duplicate { .. })));
    }

    #[test]
    fn test_search_matches_name_and_sku() {
        let catalog = demo_catalog();
        assert_eq!(catalog.search("milk").len(), 1);
        assert_eq!(catalog.search("cloth").len(), 1);
        assert_eq!(catalog.search("").len(), 2);
        assert!(catalog.search("bread").is_empty());
    }

    #[test]
    fn test_low_stock_reports_variants_individually() {
        let catalog = demo_catalog();
        let low = catalog.low_stock(20);

        assert_eq!(low.len(), 1);
        assert_eq!(low[0].key, ItemKey::variant("1", "1-1"));
        assert_eq!(low[0].stock_quantity, 20);
    }

    #[test]
    fn test_needs_reorder_uses_each_products_point() {
        let mut milk = plain("2", "Fresh Milk", 349, 15);
        milk.reorder_point = 15;
        let mut bread = plain("4", "Whole Grain Bread", 499, 11);
        bread.reorder_point = 10;
        let catalog = Catalog::new(vec![tshirt(), milk, bread]).unwrap();

        let keys: Vec<_> = catalog.needs_reorder().into_iter().map(|l| l.key).collect();
        assert_eq!(keys, vec![ItemKey::variant("1", "1-1"), ItemKey::product("2")]);

        // An explicit threshold overrides every reorder point
        let low = catalog.low_stock(11);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].key, ItemKey::product("4"));
        assert_eq!(low[0].reorder_point, 10);
    }

    #[test]
    fn test_expiring_products() {
        let mut milk = plain("2", "Fresh Milk", 349, 50);
        milk.expiry_date = NaiveDate::from_ymd_opt(2024, 1, 28);
        let catalog = Catalog::new(vec![tshirt(), milk]).unwrap();

        let jan_27 = NaiveDate::from_ymd_opt(2024, 1, 27).unwrap();
        let jan_28 = NaiveDate::from_ymd_opt(2024, 1, 28).unwrap();
        assert!(catalog.expiring_on_or_before(jan_27).is_empty());
        assert_eq!(catalog.expiring_on_or_before(jan_28).len(), 1);
    }

    #[test]
    fn test_item_key_display() {
        assert_eq!(ItemKey::variant("1", "1-2").to_string(), "1/1-2");
        assert_eq!(ItemKey::product("2").to_string(), "2");
        assert!(ItemKey::new("1", Some("1-2")).is("1", Some("1-2")));
        assert!(!ItemKey::product("1").is("1", Some("1-2")));
    }
}
