//! # Transaction Recorder
//!
//! Turns a settled cart into an immutable [`Transaction`], hands it to the
//! reporting collaborator and writes stock back to the catalog.
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  snapshot + settlement                                                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  1. empty? ───────────────────────────► EmptyCart                       │
//! │  2. build Transaction (uuid, now, lines, amounts, operator)             │
//! │  3. ReportSink::record() ── fails ────► ReportingFailed                 │
//! │        │                                (nothing decremented, the       │
//! │        │                                 caller keeps the cart)         │
//! │        ▼                                                                │
//! │  4. CatalogStore::decrement_stock() per line                            │
//! │        │   └── fails ──► StockWarning (never retried, sale stands)      │
//! │        ▼                                                                │
//! │  FinalizedSale { transaction, stock_warnings }                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::cart::CartSnapshot;
use crate::catalog::ItemKey;
use crate::collaborators::{CatalogStore, ReportSink};
use crate::error::{CatalogError, EngineError, EngineResult};
use crate::settlement::Settlement;
use crate::types::{PaymentMethod, Transaction};

/// A stock write-back that did not go through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockWarning {
    pub key: ItemKey,
    pub sku: String,
    pub quantity: i64,
    #[serde(serialize_with = "serialize_display")]
    pub error: CatalogError,
}

fn serialize_display<S: serde::Serializer>(err: &CatalogError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// A recorded sale plus any stock bookkeeping that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedSale {
    pub transaction: Transaction,
    pub stock_warnings: Vec<StockWarning>,
}

impl FinalizedSale {
    /// True when every line's stock was decremented.
    pub fn is_clean(&self) -> bool {
        self.stock_warnings.is_empty()
    }
}

/// Finalizes settled carts against the catalog and reporting collaborators.
#[derive(Clone)]
pub struct Recorder {
    catalog: Arc<dyn CatalogStore>,
    reports: Arc<dyn ReportSink>,
}

impl Recorder {
    pub fn new(catalog: Arc<dyn CatalogStore>, reports: Arc<dyn ReportSink>) -> Self {
        Recorder { catalog, reports }
    }

    /// Records the sale and decrements stock.
    ///
    /// ## Errors
    /// - `EmptyCart` if the snapshot has no lines
    /// - `ReportingFailed` if history did not accept the transaction; no
    ///   stock was touched and the caller should keep the cart
    ///
    /// Stock failures are not errors: they come back as
    /// [`FinalizedSale::stock_warnings`].
    pub async fn finalize(
        &self,
        snapshot: &CartSnapshot,
        settlement: &Settlement,
        payment_method: PaymentMethod,
        operator_id: &str,
    ) -> EngineResult<FinalizedSale> {
        if snapshot.is_empty() {
            return Err(EngineError::EmptyCart);
        }

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            lines: snapshot.lines().to_vec(),
            subtotal: settlement.subtotal,
            tax: settlement.tax,
            total: settlement.total,
            discount: settlement.discount,
            amount_paid: settlement.paid,
            change: settlement.change,
            payment_method,
            operator_id: operator_id.to_string(),
            timestamp: Utc::now(),
        };

        self.reports.record(&transaction).await?;

        let mut stock_warnings = Vec::new();
        for line in &transaction.lines {
            if let Err(error) = self
                .catalog
                .decrement_stock(&line.product_id, line.variant_id.as_deref(), line.quantity)
                .await
            {
                stock_warnings.push(StockWarning {
                    key: line.key(),
                    sku: line.sku.clone(),
                    quantity: line.quantity,
                    error,
                });
            }
        }

        Ok(FinalizedSale {
            transaction,
            stock_warnings,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::catalog::tests::{plain, tshirt};
    use crate::collaborators::CatalogStore;
    use crate::error::{ReportError, StockConflict};
    use crate::memory::{MemoryCatalog, MemoryReportSink};
    use crate::money::Money;
    use crate::settlement::Totals;
    use crate::types::{Currency, TaxRate};

    fn setup() -> (Arc<MemoryCatalog>, Arc<MemoryReportSink>, Recorder) {
        let catalog = Arc::new(MemoryCatalog::new(vec![tshirt(), plain("2", "Fresh Milk", 349, 1)]).unwrap());
        let reports = Arc::new(MemoryReportSink::new());
        let recorder = Recorder::new(catalog.clone(), reports.clone());
        (catalog, reports, recorder)
    }

    fn settle(snapshot: &CartSnapshot, tender: &str) -> Settlement {
        let totals = Totals::compute(snapshot.lines(), TaxRate::default());
        Settlement::settle_tender(totals, tender, &Currency::usd()).unwrap()
    }

    #[tokio::test]
    async fn test_finalize_records_and_decrements() {
        let (catalog, reports, recorder) = setup();
        let shirt = tshirt();
        let mut cart = Cart::new();
        cart.add_item(&shirt, shirt.variant("1-1")).unwrap();
        cart.add_item(&shirt, shirt.variant("1-1")).unwrap();

        let snapshot = cart.snapshot();
        let settlement = settle(&snapshot, "50.00");
        let sale = recorder
            .finalize(&snapshot, &settlement, PaymentMethod::Cash, "7")
            .await
            .unwrap();

        assert!(sale.is_clean());
        let tx = &sale.transaction;
        assert_eq!(tx.subtotal.cents(), 3998);
        assert_eq!(tx.tax.cents(), 400);
        assert_eq!(tx.total.cents(), 4398);
        assert_eq!(tx.change.cents(), 602);
        assert_eq!(tx.amount_paid, Money::from_cents(5000));
        assert_eq!(tx.operator_id, "7");
        assert_eq!(tx.lines, snapshot.lines());

        assert_eq!(reports.transactions(), vec![tx.clone()]);
        let after = catalog.snapshot().await.unwrap();
        assert_eq!(after.effective_stock("1", Some("1-1")), Some(18));
    }

    #[tokio::test]
    async fn test_finalize_empty_cart() {
        let (_, reports, recorder) = setup();
        let snapshot = CartSnapshot::default();
        let settlement = Settlement::settle(Totals::default(), Money::zero());

        let err = recorder
            .finalize(&snapshot, &settlement, PaymentMethod::Card, "1")
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::EmptyCart);
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_lost_stock_race_is_a_warning() {
        let (catalog, reports, recorder) = setup();
        let milk = plain("2", "Fresh Milk", 349, 1);
        let mut cart = Cart::new();
        cart.add_item(&milk, None).unwrap();
        let snapshot = cart.snapshot();

        // Another terminal sells the last unit first
        catalog.decrement_stock("2", None, 1).await.unwrap();

        let sale = recorder
            .finalize(&snapshot, &settle(&snapshot, "5"), PaymentMethod::Cash, "1")
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(sale.stock_warnings.len(), 1);
        assert_eq!(
            sale.stock_warnings[0].error,
            CatalogError::StockConflict(StockConflict {
                product_id: "2".to_string(),
                variant_id: None,
                requested: 1,
                available: 0,
            })
        );
        // Stock never goes negative
        let after = catalog.snapshot().await.unwrap();
        assert_eq!(after.effective_stock("2", None), Some(0));
    }

    #[tokio::test]
    async fn test_reporting_failure_touches_nothing() {
        let (catalog, reports, recorder) = setup();
        reports.set_fail_on_record(true);

        let milk = plain("2", "Fresh Milk", 349, 1);
        let mut cart = Cart::new();
        cart.add_item(&milk, None).unwrap();
        let snapshot = cart.snapshot();

        let err = recorder
            .finalize(&snapshot, &settle(&snapshot, "5"), PaymentMethod::Cash, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ReportingFailed(ReportError::Unavailable(_))));

        let after = catalog.snapshot().await.unwrap();
        assert_eq!(after.effective_stock("2", None), Some(1));
    }
}
