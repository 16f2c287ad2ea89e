//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── EngineError      - Cart / resolver / settlement / recorder        │
//! │  ├── CatalogError     - What a catalog collaborator reports            │
//! │  ├── ReportError      - What a history collaborator reports            │
//! │  └── ValidationError  - Catalog invariants, config values              │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures (→ CatalogError)             │
//! │                                                                         │
//! │  terminal errors (in app)                                              │
//! │  └── TerminalError    - What the operator sees (code + message)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is a value returned to the caller. A failed cart mutation
//! leaves the cart exactly as it was before the call.

use thiserror::Error;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors raised by the order engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A multi-variant product was added without a resolved variant.
    #[error("Product {product_id} requires a variant selection")]
    VariantRequired { product_id: String },

    /// The chosen attributes do not narrow the product to exactly one variant.
    ///
    /// ## User Workflow
    /// ```text
    /// T-Shirt: pick color=Red ──► 2 variants match (S, M)
    ///      │
    ///      ▼
    /// IncompleteSelection ──► "Add to Cart" stays disabled
    ///      │
    ///      ▼
    /// pick size=S ──► exactly 1 match ──► selectable
    /// ```
    #[error("Selection for product {product_id} does not identify a single variant")]
    IncompleteSelection { product_id: String },

    /// A variant id that does not belong to the product.
    #[error("Product {product_id} has no variant {variant_id}")]
    UnknownVariant {
        product_id: String,
        variant_id: String,
    },

    /// Product id not present in the current catalog snapshot.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Effective stock is zero (or below) at the moment of adding.
    #[error("{sku} is out of stock")]
    OutOfStock { sku: String },

    /// The requested quantity would exceed the available stock.
    #[error("Cannot add more {sku}: available {available}, requested {requested}")]
    StockExceeded {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// The tendered amount is not a non-negative finite number.
    #[error("Invalid tender '{input}': {reason}")]
    InvalidTender { input: String, reason: String },

    /// Pend or finalize was attempted on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// No suspended order with this id (never existed or already resumed).
    #[error("Pending order not found: {0}")]
    NotFound(String),

    /// The catalog refused a stock decrement because stock ran out first.
    #[error(transparent)]
    StockConflict(StockConflict),

    /// The catalog collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(CatalogError),

    /// The reporting collaborator did not accept the transaction.
    #[error("Failed to record transaction: {0}")]
    ReportingFailed(#[from] ReportError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::StockConflict(conflict) => EngineError::StockConflict(conflict),
            other => EngineError::Catalog(other),
        }
    }
}

// =============================================================================
// Catalog Error
// =============================================================================

/// A lost compare-and-decrement race.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Stock conflict for {product_id}{}: requested {requested}, available {available}",
    unit_suffix(.variant_id))]
pub struct StockConflict {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub requested: i64,
    pub available: i64,
}

/// Failures reported by a catalog collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Stock was consumed concurrently; nothing was decremented.
    #[error(transparent)]
    StockConflict(StockConflict),

    /// The stock record does not exist.
    #[error("Stock record not found: {product_id}{}", unit_suffix(.variant_id))]
    NotFound {
        product_id: String,
        variant_id: Option<String>,
    },

    /// The store could not be reached or failed internally.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Report Error
// =============================================================================

/// Failures reported by a transaction history collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// A transaction with this id is already in history.
    #[error("Transaction {0} already recorded")]
    Duplicate(String),

    /// History is not accepting transactions right now.
    #[error("History unavailable: {0}")]
    Unavailable(String),
}

/// Renders `/variant` for variant stock records, nothing for plain products.
fn unit_suffix(variant_id: &Option<String>) -> String {
    variant_id
        .as_deref()
        .map(|v| format!("/{v}"))
        .unwrap_or_default()
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two variants with the same attributes).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
