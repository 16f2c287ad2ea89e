//! # Collaborator Interfaces
//!
//! The narrow seams between the engine and the systems it does not own.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CatalogStore ─── snapshot() ─────────────► Catalog (read)             │
//! │        ▲                                                                │
//! │        └───────── decrement_stock() ◄─────── Recorder (atomic write)    │
//! │                                                                         │
//! │   ReportSink ◄─── record(&Transaction) ◄──── Recorder                   │
//! │                                                                         │
//! │   SettingsSource ── tax_rate(), currency() ─► Settlement                │
//! │   OperatorSource ── current_operator_id() ──► Recorder                  │
//! │                                                                         │
//! │   DisplaySink ◄─── publish(&DisplayFrame) ◄─ every cart mutation        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations live elsewhere: [`crate::memory`] for tests and demos,
//! `tally-db` for SQLite.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::catalog::Catalog;
use crate::error::{CatalogError, ReportError};
use crate::settlement::Totals;
use crate::types::{Currency, TaxRate, Transaction};

// =============================================================================
// Catalog Store
// =============================================================================

/// Owner of products and stock.
///
/// Callers never hold a mutable reference to stock numbers: they read a
/// snapshot, and write only through `decrement_stock`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Current products, variants and stock.
    async fn snapshot(&self) -> Result<Catalog, CatalogError>;

    /// Atomically subtracts `quantity` from one stock record.
    ///
    /// Must fail with `CatalogError::StockConflict` and change nothing if
    /// fewer than `quantity` units remain.
    async fn decrement_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CatalogError>;
}

// =============================================================================
// Report Sink
// =============================================================================

/// Consumer of finalized transactions.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Accepts a transaction into history. Nothing is stored on error.
    async fn record(&self, transaction: &Transaction) -> Result<(), ReportError>;
}

// =============================================================================
// Settings & Operator
// =============================================================================

pub trait SettingsSource: Send + Sync {
    fn tax_rate(&self) -> TaxRate;
    fn currency(&self) -> Currency;
}

pub trait OperatorSource: Send + Sync {
    fn current_operator_id(&self) -> String;
}

// =============================================================================
// Display
// =============================================================================

/// A read-only view of the active cart for a customer-facing display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayFrame {
    /// No active order; the display shows its idle rotation.
    Idle,
    Active {
        lines: Vec<CartLine>,
        totals: Totals,
    },
}

impl DisplayFrame {
    /// The frame for a set of cart lines; `Idle` when there are none.
    pub fn for_lines(lines: &[CartLine], rate: TaxRate) -> Self {
        if lines.is_empty() {
            return DisplayFrame::Idle;
        }
        DisplayFrame::Active {
            lines: lines.to_vec(),
            totals: Totals::compute(lines, rate),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DisplayFrame::Idle)
    }
}

pub trait DisplaySink: Send + Sync {
    fn publish(&self, frame: &DisplayFrame);
}

// =============================================================================
// Unit Tests
// =============================================================================
