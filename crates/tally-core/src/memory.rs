//! # In-Memory Collaborators
//!
//! Process-local [`CatalogStore`] and [`ReportSink`] implementations for
//! tests and the demo terminal. Persistent versions live in `tally-db`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::collaborators::{CatalogStore, ReportSink};
use crate::error::{CatalogError, ReportError, StockConflict};
use crate::types::{Product, Transaction};
use crate::validation::{validate_stock, ValidationResult};

// =============================================================================
// Memory Catalog
// =============================================================================

/// A mutex-guarded product list.
///
/// `decrement_stock` checks and subtracts under one lock, so concurrent
/// callers can never oversell.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: Mutex<Vec<Product>>,
}

impl MemoryCatalog {
    /// Creates a catalog, validating the products the same way a snapshot
    /// would.
    pub fn new(products: Vec<Product>) -> ValidationResult<Self> {
        let catalog = Catalog::new(products)?;
        Ok(MemoryCatalog {
            products: Mutex::new(catalog.products().to_vec()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Product>> {
        self.products.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites one stock record, e.g. after a delivery or a recount.
    pub fn set_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        validate_stock(quantity).map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let mut products = self.lock();
        *stock_slot(&mut products, product_id, variant_id)? = quantity;
        Ok(())
    }
}

/// Finds the stock figure for one sellable unit.
fn stock_slot<'a>(
    products: &'a mut [Product],
    product_id: &str,
    variant_id: Option<&str>,
) -> Result<&'a mut i64, CatalogError> {
    let not_found = || CatalogError::NotFound {
        product_id: product_id.to_string(),
        variant_id: variant_id.map(str::to_string),
    };

    let product = products
        .iter_mut()
        .find(|p| p.id == product_id)
        .ok_or_else(not_found)?;

    match variant_id {
        Some(variant_id) => product
            .variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .map(|v| &mut v.stock_quantity)
            .ok_or_else(not_found),
        None => Ok(&mut product.stock_quantity),
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn snapshot(&self) -> Result<Catalog, CatalogError> {
        let products = self.lock().clone();
        Catalog::new(products).map_err(|e| CatalogError::Unavailable(e.to_string()))
    }

    async fn decrement_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        let mut products = self.lock();
        let stock = stock_slot(&mut products, product_id, variant_id)?;

        if *stock < quantity {
            return Err(CatalogError::StockConflict(StockConflict {
                product_id: product_id.to_string(),
                variant_id: variant_id.map(str::to_string),
                requested: quantity,
                available: *stock,
            }));
        }

        *stock -= quantity;
        Ok(())
    }
}

// =============================================================================
// Memory Report Sink
// =============================================================================

/// Append-only transaction history held in memory.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    transactions: Mutex<Vec<Transaction>>,
    fail_on_record: AtomicBool,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transaction>> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every following `record` call fail (for testing retry paths).
    pub fn set_fail_on_record(&self, fail: bool) {
        self.fail_on_record.store(fail, Ordering::SeqCst);
    }

    /// Copy of the history, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record(&self, transaction: &Transaction) -> Result<(), ReportError> {
        if self.fail_on_record.load(Ordering::SeqCst) {
            return Err(ReportError::Unavailable(
                "report sink is not accepting transactions".to_string(),
            ));
        }
        let mut history = self.lock();
        if history.iter().any(|t| t.id == transaction.id) {
            return Err(ReportError::Duplicate(transaction.id.clone()));
        }
        history.push(transaction.clone());
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::tests::{plain, tshirt};

    #[tokio::test]
    async fn test_decrement_variant_and_product() {
        let catalog = MemoryCatalog::new(vec![tshirt(), plain("2", "Fresh Milk", 349, 50)]).unwrap();

        catalog.decrement_stock("1", Some("1-2"), 3).await.unwrap();
        catalog.decrement_stock("2", None, 50).await.unwrap();

        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.effective_stock("1", Some("1-2")), Some(27));
        assert_eq!(snapshot.effective_stock("2", None), Some(0));
    }

    #[tokio::test]
    async fn test_decrement_conflict_changes_nothing() {
        let catalog = MemoryCatalog::new(vec![plain("2", "Fresh Milk", 349, 2)]).unwrap();

        let err = catalog.decrement_stock("2", None, 3).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::StockConflict(StockConflict { available: 2, .. })
        ));
        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.effective_stock("2", None), Some(2));
    }

    #[tokio::test]
    async fn test_decrement_unknown_record() {
        let catalog = MemoryCatalog::new(vec![tshirt()]).unwrap();
        let err = catalog.decrement_stock("1", Some("1-9"), 1).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_oversell() {
        let catalog = Arc::new(MemoryCatalog::new(vec![plain("2", "Fresh Milk", 349, 5)]).unwrap());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let catalog = catalog.clone();
                tokio::spawn(async move { catalog.decrement_stock("2", None, 1).await.is_ok() })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap() {
                sold += 1;
            }
        }

        assert_eq!(sold, 5);
        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.effective_stock("2", None), Some(0));
    }

    #[tokio::test]
    async fn test_set_stock() {
        let catalog = MemoryCatalog::new(vec![tshirt()]).unwrap();
        catalog.set_stock("1", Some("1-1"), 0).unwrap();
        assert!(catalog.set_stock("1", Some("1-1"), -1).is_err());

        let snapshot = catalog.snapshot().await.unwrap();
        assert_eq!(snapshot.effective_stock("1", Some("1-1")), Some(0));
    }

    #[tokio::test]
    async fn test_report_sink_failure_toggle() {
        let sink = MemoryReportSink::new();
        sink.set_fail_on_record(true);

        let tx = Transaction {
            id: "t1".to_string(),
            lines: Vec::new(),
            subtotal: Default::default(),
            tax: Default::default(),
            total: Default::default(),
            discount: Default::default(),
            amount_paid: Default::default(),
            change: Default::default(),
            payment_method: crate::types::PaymentMethod::Cash,
            operator_id: "1".to_string(),
            timestamp: chrono::Utc::now(),
        };
        assert!(matches!(
            sink.record(&tx).await,
            Err(ReportError::Unavailable(_))
        ));
        assert!(sink.is_empty());

        sink.set_fail_on_record(false);
        sink.record(&tx).await.unwrap();
        assert_eq!(sink.len(), 1);

        // History is append-only per id
        assert_eq!(
            sink.record(&tx).await,
            Err(ReportError::Duplicate("t1".to_string()))
        );
        assert_eq!(sink.len(), 1);
    }
}
