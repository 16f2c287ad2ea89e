//! # Validation Module
//!
//! Invariant checks for catalog data and configuration values.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Catalog collaborator hands over products                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Catalog::new ── validate_product() ← THIS MODULE                      │
//! │  ├── sku / name present                                                │
//! │  ├── prices and stock non-negative                                     │
//! │  └── has_variants ⇔ variants non-empty, unique attribute combos        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Cart / resolver trust the snapshot from here on                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Product, Variant};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("CLOTH001-R-S").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product or variant): 1–200 characters.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    non_negative("price", cents)
}

/// Validates a stock quantity (≥ 0).
pub fn validate_stock(quantity: i64) -> ValidationResult<()> {
    non_negative("stock quantity", quantity)
}

/// Validates a tax rate in basis points: 0% to 100%.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Product Validators
// =============================================================================

fn validate_variant(variant: &Variant) -> ValidationResult<()> {
    if variant.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "variant id".to_string(),
        });
    }
    validate_name("variant name", &variant.name)?;
    validate_sku(&variant.sku)?;
    validate_price_cents(variant.price_cents)?;
    validate_stock(variant.stock_quantity)?;

    if variant.attributes.is_empty() {
        return Err(ValidationError::Required {
            field: format!("attributes of variant {}", variant.id),
        });
    }

    Ok(())
}

/// Validates a catalog product and its variants.
///
/// ## Rules
/// - id, name and SKU present; prices non-negative
/// - A product without variants has stock ≥ 0 and no variant list
/// - A product with variants has at least one, with unique ids and unique
///   attribute combinations
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    if product.id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product id".to_string(),
        });
    }
    validate_name("name", &product.name)?;
    validate_sku(&product.sku)?;
    validate_price_cents(product.base_price_cents)?;
    non_negative("reorder point", product.reorder_point)?;

    if !product.has_variants {
        validate_stock(product.stock_quantity)?;
        if !product.variants.is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "variants".to_string(),
                reason: format!("product {} does not use variants", product.id),
            });
        }
        return Ok(());
    }

    if product.variants.is_empty() {
        return Err(ValidationError::Required {
            field: format!("variants of product {}", product.id),
        });
    }

    let mut ids = HashSet::new();
    let mut combinations = HashSet::new();
    for variant in &product.variants {
        validate_variant(variant)?;

        if !ids.insert(variant.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "variant id".to_string(),
                value: variant.id.clone(),
            });
        }
        if !combinations.insert(&variant.attributes) {
            return Err(ValidationError::Duplicate {
                field: "variant attributes".to_string(),
                value: variant
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(","),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
