//! # tally-core: Order Engine for Tally POS
//!
//! This crate is the **heart** of Tally POS. It owns the active cart, the
//! stock gates, variant resolution, suspended orders and settlement math.
//! It performs no I/O of its own: catalog, history, settings and display
//! are reached through the traits in [`collaborators`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tally-terminal (operator REPL)                  │   │
//! │  │    add / pick / qty / pend / resume / pay / report              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌────────────┐   │   │
//! │  │   │ variant  │  │   cart   │  │ settlement │  │ suspension │   │   │
//! │  │   │ resolver │  │  gates   │  │   totals   │  │   store    │   │   │
//! │  │   └──────────┘  └──────────┘  └────────────┘  └────────────┘   │   │
//! │  │                        recorder ──► collaborators               │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO UI STATE                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CatalogStore / ReportSink              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │          SQLite catalog, atomic stock decrement, history        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Variant, Transaction, TaxRate, Currency
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Engine, catalog and validation errors
//! - [`validation`] - Catalog invariants
//! - [`catalog`] - Immutable catalog snapshot
//! - [`variant`] - Attribute selection and variant resolution
//! - [`cart`] - The active order and its stock gates
//! - [`settlement`] - Totals, tax, discount and change
//! - [`suspension`] - Shared store of parked orders
//! - [`recorder`] - Finalizes a settled cart into a transaction
//! - [`collaborators`] - Traits for the systems the engine talks to
//! - [`memory`] - In-process collaborator implementations
//! - [`report`] - Sales summaries over transaction history
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cart::Cart;
//! use tally_core::settlement::{Settlement, Totals};
//! use tally_core::types::{Currency, Product, TaxRate};
//!
//! let milk = Product {
//!     id: "2".to_string(),
//!     name: "Fresh Milk".to_string(),
//!     base_price_cents: 349,
//!     sku: "DAIRY001".to_string(),
//!     category: "Dairy".to_string(),
//!     stock_quantity: 50,
//!     reorder_point: 15,
//!     expiry_date: None,
//!     has_variants: false,
//!     variants: Vec::new(),
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_item(&milk, None).unwrap();
//! cart.add_item(&milk, None).unwrap();
//!
//! let totals = Totals::compute(cart.lines(), TaxRate::from_bps(1000));
//! assert_eq!(totals.total.cents(), 768); // 6.98 + 0.70
//!
//! let settlement = Settlement::settle_tender(totals, "10", &Currency::usd()).unwrap();
//! assert_eq!(settlement.change.cents(), 232);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod collaborators;
pub mod error;
pub mod memory;
pub mod money;
pub mod recorder;
pub mod report;
pub mod settlement;
pub mod suspension;
pub mod types;
pub mod validation;
pub mod variant;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use cart::{Cart, CartLine, CartSnapshot};
pub use catalog::{Catalog, ItemKey};
pub use collaborators::{
    CatalogStore, DisplayFrame, DisplaySink, OperatorSource, ReportSink, SettingsSource,
};
pub use error::{
    CatalogError, EngineError, EngineResult, ReportError, StockConflict, ValidationError,
};
pub use money::Money;
pub use recorder::{FinalizedSale, Recorder, StockWarning};
pub use settlement::{Settlement, Totals};
pub use suspension::{PendingSummary, SuspensionStore};
pub use types::*;
pub use variant::AttributeSelection;
