//! # Variant Resolver
//!
//! Narrows a multi-variant product down to the one concrete variant the
//! operator means, from the attributes picked so far.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  T-Shirt variants         selection          matches                    │
//! │  ─────────────────        ─────────────      ───────────────────────    │
//! │  Red  / S                 {}                 none (empty selection)     │
//! │  Red  / M                 {color: Red}       Red/S, Red/M → ambiguous   │
//! │  Blue / S                 {color: Red,       Red/S → resolved           │
//! │  Blue / M                  size: S}                                     │
//! │                           {color: Green}     none → incomplete          │
//! │                                                                         │
//! │  Unspecified attributes are wildcards. Every change re-resolves from    │
//! │  scratch against ALL attributes chosen so far.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::{Attributes, Product, Variant};

// =============================================================================
// Attribute Selection
// =============================================================================

/// The attributes an operator has picked for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSelection {
    chosen: Attributes,
}

impl AttributeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or replaces one attribute value.
    pub fn choose(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.chosen.insert(name.into(), value.into());
        self
    }

    /// Forgets the value picked for `name`, if any.
    pub fn clear(&mut self, name: &str) {
        self.chosen.remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.chosen.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.chosen
    }
}

impl From<Attributes> for AttributeSelection {
    fn from(chosen: Attributes) -> Self {
        AttributeSelection { chosen }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Returns the unique variant compatible with `selection`.
///
/// ## Errors
/// `IncompleteSelection` when the product has no variants, the selection is
/// empty, or zero or several variants match.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use tally_core::types::{Product, Variant};
/// use tally_core::variant::{resolve, AttributeSelection};
///
/// let variant = |id: &str, size: &str| Variant {
///     id: id.to_string(),
///     name: format!("Cap {size}"),
///     sku: format!("CAP-{size}"),
///     price_cents: 1200,
///     stock_quantity: 5,
///     attributes: BTreeMap::from([("size".to_string(), size.to_string())]),
/// };
/// let cap = Product {
///     id: "9".to_string(),
///     name: "Cap".to_string(),
///     base_price_cents: 1200,
///     sku: "CAP".to_string(),
///     category: "Clothing".to_string(),
///     stock_quantity: 0,
///     reorder_point: 0,
///     expiry_date: None,
///     has_variants: true,
///     variants: vec![variant("9-1", "S"), variant("9-2", "L")],
/// };
///
/// let mut selection = AttributeSelection::new();
/// assert!(resolve(&cap, &selection).is_err());
/// selection.choose("size", "L");
/// assert_eq!(resolve(&cap, &selection).unwrap().id, "9-2");
/// ```
pub fn resolve<'a>(product: &'a Product, selection: &AttributeSelection) -> EngineResult<&'a Variant> {
    let incomplete = || EngineError::IncompleteSelection {
        product_id: product.id.clone(),
    };

    if !product.has_variants || selection.is_empty() {
        return Err(incomplete());
    }

    let mut matches = product
        .variants
        .iter()
        .filter(|v| v.matches(selection.attributes()));

    match (matches.next(), matches.next()) {
        (Some(variant), None) => Ok(variant),
        _ => Err(incomplete()),
    }
}

/// All attribute names used by the product's variants, sorted.
pub fn attribute_names(product: &Product) -> Vec<String> {
    product
        .variants
        .iter()
        .flat_map(|v| v.attributes.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Values of `attribute` still compatible with the rest of the selection,
/// sorted.
///
/// The current value of `attribute` itself is ignored, so the operator can
/// always switch to a sibling value.
pub fn available_values(
    product: &Product,
    selection: &AttributeSelection,
    attribute: &str,
) -> Vec<String> {
    let mut others = selection.attributes().clone();
    others.remove(attribute);

    product
        .variants
        .iter()
        .filter(|v| v.matches(&others))
        .filter_map(|v| v.attributes.get(attribute).cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::{plain, tshirt};

    #[test]
    fn test_empty_selection_is_incomplete() {
        let shirt = tshirt();
        let err = resolve(&shirt, &AttributeSelection::new()).unwrap_err();
        assert_eq!(
            err,
            EngineError::IncompleteSelection {
                product_id: "1".to_string()
            }
        );
    }

    #[test]
    fn test_partial_selection_is_ambiguous() {
        let shirt = tshirt();
        let mut selection = AttributeSelection::new();
        selection.choose("color", "Red");
        assert!(resolve(&shirt, &selection).is_err());
    }

    #[test]
    fn test_full_selection_resolves() {
        let shirt = tshirt();
        let mut selection = AttributeSelection::new();
        selection.choose("color", "Red").choose("size", "S");

        let variant = resolve(&shirt, &selection).unwrap();
        assert_eq!(variant.id, "1-1");
        assert_eq!(variant.sku, "CLOTH001-R-S");
    }

    #[test]
    fn test_changing_a_value_re_resolves() {
        let shirt = tshirt();
        let mut selection = AttributeSelection::new();
        selection.choose("color", "Red").choose("size", "S");
        assert_eq!(resolve(&shirt, &selection).unwrap().id, "1-1");

        selection.choose("color", "Blue");
        assert_eq!(resolve(&shirt, &selection).unwrap().id, "1-3");

        selection.clear("size");
        assert!(resolve(&shirt, &selection).is_err());
    }

    #[test]
    fn test_incompatible_combination_is_incomplete() {
        let shirt = tshirt();
        let mut selection = AttributeSelection::new();
        selection.choose("color", "Green").choose("size", "S");
        assert!(resolve(&shirt, &selection).is_err());
    }

    #[test]
    fn test_product_without_variants_never_resolves() {
        let milk = plain("2", "Fresh Milk", 349, 50);
        let mut selection = AttributeSelection::new();
        selection.choose("size", "S");
        assert!(resolve(&milk, &selection).is_err());
    }

    #[test]
    fn test_attribute_names_and_available_values() {
        let mut shirt = tshirt();
        shirt.variants.retain(|v| v.id != "1-4");

        assert_eq!(attribute_names(&shirt), vec!["color", "size"]);

        let mut selection = AttributeSelection::new();
        assert_eq!(available_values(&shirt, &selection, "size"), vec!["M", "S"]);

        selection.choose("color", "Blue");
        assert_eq!(available_values(&shirt, &selection, "size"), vec!["S"]);
        // The attribute being edited does not restrict its own options
        assert_eq!(
            available_values(&shirt, &selection, "color"),
            vec!["Blue", "Red"]
        );
    }
}
