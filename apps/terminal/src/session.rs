//! # Terminal Session
//!
//! One operator's working state: the active cart, the variant picker and
//! the wiring to the shared collaborators.
//!
//! ## Session Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Operations                                   │
//! │                                                                         │
//! │  Operator Action         Session Method          Effect                 │
//! │  ───────────────         ──────────────          ──────                 │
//! │                                                                         │
//! │  pick 1 color=Red ─────► select_attribute() ───► selection narrowed    │
//! │  add 1 ────────────────► add() ────────────────► line merged/appended  │
//! │  qty 1/1-1 +1 ─────────► change_quantity() ────► bounded by stock      │
//! │  rm 1/1-1 ─────────────► remove() ─────────────► line dropped          │
//! │  pend ─────────────────► pend() ───────────────► cart parked + cleared │
//! │  resume <id> ──────────► resume() ─────────────► parked cart restored  │
//! │  pay 50 cash ──────────► checkout() ───────────► recorded, then cleared│
//! │                                                                         │
//! │  Every mutation: fresh catalog snapshot first, DisplayFrame after.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The session is used through `&mut self` by one operator, so cart
//! mutations need no lock. Shared state lives behind the collaborators:
//! stock decrements are compare-and-decrement in the catalog store, and
//! [`SuspensionStore::resume`] is atomic across sessions.

use std::sync::Arc;

use tally_core::variant::{self, AttributeSelection};
use tally_core::{
    Attributes, Cart, CartLine, Catalog, CatalogStore, DisplayFrame, DisplaySink, EngineError,
    FinalizedSale, OperatorSource, PaymentMethod, PendingSummary, Recorder, ReportSink,
    SettingsSource, Settlement, SuspensionStore, Totals, Variant,
};
use tracing::{debug, info, warn};

use crate::error::{TerminalError, TerminalResult};

/// Where the variant picker stands for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStatus {
    pub product_id: String,
    pub chosen: Attributes,
    /// The single matching variant, once the selection is complete.
    pub resolved: Option<Variant>,
    /// For each attribute, the values still compatible with the others.
    pub options: Vec<(String, Vec<String>)>,
}

/// The active order for one terminal.
pub struct TerminalSession {
    cart: Cart,
    selection: Option<(String, AttributeSelection)>,
    pending: SuspensionStore,
    catalog: Arc<dyn CatalogStore>,
    recorder: Recorder,
    settings: Arc<dyn SettingsSource>,
    operator: Arc<dyn OperatorSource>,
    display: Arc<dyn DisplaySink>,
}

impl TerminalSession {
    /// Creates a session with an empty cart and publishes the idle frame.
    ///
    /// `pending` is cloned from a store shared by every session on this
    /// machine.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        reports: Arc<dyn ReportSink>,
        settings: Arc<dyn SettingsSource>,
        operator: Arc<dyn OperatorSource>,
        display: Arc<dyn DisplaySink>,
        pending: SuspensionStore,
    ) -> Self {
        let session = TerminalSession {
            cart: Cart::new(),
            selection: None,
            pending,
            recorder: Recorder::new(catalog.clone(), reports),
            catalog,
            settings,
            operator,
            display,
        };
        session.publish();
        session
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Subtotal, tax and total of the active cart at the current tax rate.
    pub fn totals(&self) -> Totals {
        Totals::compute(self.cart.lines(), self.settings.tax_rate())
    }

    /// What the customer display shows right now.
    pub fn frame(&self) -> DisplayFrame {
        DisplayFrame::for_lines(self.cart.lines(), self.settings.tax_rate())
    }

    /// A fresh catalog snapshot.
    pub async fn catalog(&self) -> TerminalResult<Catalog> {
        Ok(self.catalog.snapshot().await?)
    }

    pub fn pending(&self) -> Vec<PendingSummary> {
        self.pending.list()
    }

    // =========================================================================
    // Variant selection
    // =========================================================================

    /// Records one attribute choice for `product_id`.
    ///
    /// Choosing for a different product starts a new selection.
    pub async fn select_attribute(
        &mut self,
        product_id: &str,
        attribute: &str,
        value: &str,
    ) -> TerminalResult<SelectionStatus> {
        let catalog = self.catalog().await?;
        let product = catalog
            .product(product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

        if !product.has_variants {
            return Err(TerminalError::validation(format!(
                "{} has no variants to pick from",
                product.name
            )));
        }
        if !variant::attribute_names(product).iter().any(|n| n == attribute) {
            return Err(TerminalError::validation(format!(
                "{} has no attribute '{attribute}'",
                product.name
            )));
        }

        if !matches!(&self.selection, Some((id, _)) if id == product_id) {
            self.selection = None;
        }
        let (_, selection) = self
            .selection
            .get_or_insert_with(|| (product_id.to_string(), AttributeSelection::new()));
        selection.choose(attribute, value);
        let selection: &AttributeSelection = selection;

        debug!(product_id, attribute, value, "Attribute selected");

        Ok(SelectionStatus {
            product_id: product_id.to_string(),
            chosen: selection.attributes().clone(),
            resolved: variant::resolve(product, selection).ok().cloned(),
            options: variant::attribute_names(product)
                .into_iter()
                .map(|name| {
                    let values = variant::available_values(product, selection, &name);
                    (name, values)
                })
                .collect(),
        })
    }

    // =========================================================================
    // Cart mutations
    // =========================================================================

    /// Adds one unit of a product.
    ///
    /// ## Variant Resolution
    /// - `variant_id` given: that variant, or `UnknownVariant`
    /// - multi-variant product with a picker selection: the resolved variant,
    ///   or `IncompleteSelection`
    /// - multi-variant product without a selection: `VariantRequired`
    ///
    /// The picker selection is reset after a successful add.
    pub async fn add(&mut self, product_id: &str, variant_id: Option<&str>) -> TerminalResult<()> {
        let catalog = self.catalog().await?;
        let product = catalog
            .product(product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

        let variant = match variant_id {
            Some(vid) => Some(product.variant(vid).ok_or_else(|| EngineError::UnknownVariant {
                product_id: product_id.to_string(),
                variant_id: vid.to_string(),
            })?),
            None => match &self.selection {
                Some((id, selection)) if id == product_id && product.has_variants => {
                    Some(variant::resolve(product, selection)?)
                }
                _ => None,
            },
        };

        self.cart.add_item(product, variant)?;
        self.selection = None;

        debug!(
            product_id,
            variant_id = variant.map(|v| v.id.as_str()),
            lines = self.cart.line_count(),
            "Item added"
        );
        self.publish();
        Ok(())
    }

    /// Adjusts a line's quantity by `delta`, bounded by current stock.
    pub async fn change_quantity(
        &mut self,
        product_id: &str,
        variant_id: Option<&str>,
        delta: i64,
    ) -> TerminalResult<()> {
        let catalog = self.catalog().await?;
        self.cart
            .change_quantity(&catalog, product_id, variant_id, delta)?;

        debug!(product_id, variant_id, delta, "Quantity changed");
        self.publish();
        Ok(())
    }

    pub fn remove(&mut self, product_id: &str, variant_id: Option<&str>) {
        self.cart.remove_item(product_id, variant_id);
        debug!(product_id, variant_id, "Item removed");
        self.publish();
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.selection = None;
        debug!("Cart cleared");
        self.publish();
    }

    // =========================================================================
    // Pending orders
    // =========================================================================

    /// Parks the active cart and empties it. Returns the pending id.
    pub fn pend(&mut self, note: Option<String>) -> TerminalResult<String> {
        let snapshot = self.cart.snapshot();
        let lines = snapshot.line_count();
        let id = self.pending.pend(snapshot, note)?;

        self.cart.clear();
        self.selection = None;

        info!(pending_id = %id, lines, "Order pended");
        self.publish();
        Ok(id)
    }

    /// Restores a parked order as the active cart.
    ///
    /// `id` may be a unique prefix of the pending id. A non-empty active
    /// cart is refused unless `pend_current` is set, in which case it is
    /// parked in the resumed order's place.
    pub fn resume(&mut self, id: &str, pend_current: bool) -> TerminalResult<()> {
        if !self.cart.is_empty() && !pend_current {
            return Err(TerminalError::cart(
                "Active cart is not empty; pend it before resuming another order",
            ));
        }

        let id = self.resolve_pending_id(id)?;
        let snapshot = self.pending.resume(&id)?;

        if !self.cart.is_empty() {
            let parked = self.pending.pend(self.cart.snapshot(), None)?;
            info!(pending_id = %parked, "Active cart pended before resume");
        }

        self.cart.restore(snapshot);
        self.selection = None;

        info!(pending_id = %id, lines = self.cart.line_count(), "Order resumed");
        self.publish();
        Ok(())
    }

    fn resolve_pending_id(&self, prefix: &str) -> TerminalResult<String> {
        let matches: Vec<String> = self
            .pending
            .list()
            .into_iter()
            .map(|p| p.id)
            .filter(|id| id.starts_with(prefix))
            .collect();

        match matches.as_slice() {
            [id] => Ok(id.clone()),
            [] => Err(EngineError::NotFound(prefix.to_string()).into()),
            _ => Err(TerminalError::validation(format!(
                "'{prefix}' matches {} pending orders",
                matches.len()
            ))),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Settles the cart against `tender`, records the sale and only then
    /// clears the cart.
    ///
    /// ## Failure Modes
    /// - invalid tender, empty cart, or history refusing the sale: the cart
    ///   is untouched and nothing was recorded or decremented
    /// - a stock decrement failing after the sale was recorded: the sale
    ///   stands, the failure comes back in `stock_warnings`
    pub async fn checkout(
        &mut self,
        tender: &str,
        method: PaymentMethod,
    ) -> TerminalResult<FinalizedSale> {
        if self.cart.is_empty() {
            return Err(EngineError::EmptyCart.into());
        }

        let currency = self.settings.currency();
        let settlement = Settlement::settle_tender(self.totals(), tender, &currency)?;

        if settlement.is_zero_tender() {
            warn!(
                total = %currency.format(settlement.total),
                "Zero tender: whole total recorded as discount"
            );
        }

        let operator_id = self.operator.current_operator_id();
        let sale = self
            .recorder
            .finalize(&self.cart.snapshot(), &settlement, method, &operator_id)
            .await?;

        for warning in &sale.stock_warnings {
            warn!(
                key = %warning.key,
                sku = %warning.sku,
                quantity = warning.quantity,
                error = %warning.error,
                "Stock not decremented"
            );
        }

        self.cart.clear();
        self.selection = None;

        info!(
            transaction_id = %sale.transaction.id,
            total = %currency.format(settlement.total),
            paid = %currency.format(settlement.paid),
            discount = %currency.format(settlement.discount),
            change = %currency.format(settlement.change),
            method = %method,
            "Sale completed"
        );
        self.publish();
        Ok(sale)
    }

    fn publish(&self) {
        self.display.publish(&self.frame());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, PoisonError};

    use super::*;
    use crate::config::ConfigState;
    use crate::error::ErrorCode;
    use tally_core::memory::{MemoryCatalog, MemoryReportSink};
    use tally_core::Money;
    use tally_db::seed::demo_catalog;

    #[derive(Default)]
    struct RecordingDisplay {
        frames: Mutex<Vec<DisplayFrame>>,
    }

    impl RecordingDisplay {
        fn last(&self) -> Option<DisplayFrame> {
            self.frames
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn publish(&self, frame: &DisplayFrame) {
            self.frames
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(frame.clone());
        }
    }

    struct Harness {
        catalog: Arc<MemoryCatalog>,
        reports: Arc<MemoryReportSink>,
        display: Arc<RecordingDisplay>,
        pending: SuspensionStore,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                catalog: Arc::new(MemoryCatalog::new(demo_catalog()).unwrap()),
                reports: Arc::new(MemoryReportSink::new()),
                display: Arc::new(RecordingDisplay::default()),
                pending: SuspensionStore::new(),
            }
        }

        fn session(&self) -> TerminalSession {
            let config = Arc::new(ConfigState::default());
            TerminalSession::new(
                self.catalog.clone(),
                self.reports.clone(),
                config.clone(),
                config,
                self.display.clone(),
                self.pending.clone(),
            )
        }

        async fn stock(&self, product_id: &str, variant_id: Option<&str>) -> i64 {
            self.catalog
                .snapshot()
                .await
                .unwrap()
                .effective_stock(product_id, variant_id)
                .unwrap()
        }
    }

    async fn pick_red_small(session: &mut TerminalSession) {
        session.select_attribute("1", "color", "Red").await.unwrap();
        let status = session.select_attribute("1", "size", "S").await.unwrap();
        assert_eq!(status.resolved.map(|v| v.id), Some("1-1".to_string()));
    }

    #[tokio::test]
    async fn test_tshirt_sale_end_to_end() {
        let harness = Harness::new();
        let mut session = harness.session();
        assert!(harness.display.last().unwrap().is_idle());

        pick_red_small(&mut session).await;
        session.add("1", None).await.unwrap();
        pick_red_small(&mut session).await;
        session.add("1", None).await.unwrap();

        assert_eq!(session.lines().len(), 1);
        assert_eq!(session.lines()[0].quantity, 2);

        let totals = session.totals();
        assert_eq!(totals.subtotal, Money::from_cents(3998));
        assert_eq!(totals.tax, Money::from_cents(400));
        assert_eq!(totals.total, Money::from_cents(4398));
        assert!(matches!(
            harness.display.last(),
            Some(DisplayFrame::Active { .. })
        ));

        let sale = session.checkout("50", PaymentMethod::Cash).await.unwrap();

        assert!(sale.is_clean());
        assert_eq!(sale.transaction.change, Money::from_cents(602));
        assert_eq!(sale.transaction.discount, Money::zero());
        assert_eq!(sale.transaction.operator_id, "1");
        assert!(session.is_empty());
        assert!(harness.display.last().unwrap().is_idle());
        assert_eq!(harness.reports.len(), 1);
        assert_eq!(harness.stock("1", Some("1-1")).await, 18);
    }

    #[tokio::test]
    async fn test_add_multi_variant_without_selection() {
        let harness = Harness::new();
        let mut session = harness.session();

        let err = session.add("1", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_selection_is_refused() {
        let harness = Harness::new();
        let mut session = harness.session();

        let status = session.select_attribute("1", "color", "Blue").await.unwrap();
        assert_eq!(status.resolved, None);
        assert_eq!(
            status.options,
            vec![
                ("color".to_string(), vec!["Blue".to_string(), "Red".to_string()]),
                ("size".to_string(), vec!["M".to_string(), "S".to_string()]),
            ]
        );

        let err = session.add("1", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
    }

    #[tokio::test]
    async fn test_explicit_variant_and_plain_product() {
        let harness = Harness::new();
        let mut session = harness.session();

        session.add("1", Some("1-4")).await.unwrap();
        session.add("2", None).await.unwrap();
        assert_eq!(session.lines().len(), 2);

        let err = session.add("1", Some("1-9")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);

        let err = session.add("404", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_change_quantity_rereads_stock() {
        let harness = Harness::new();
        let mut session = harness.session();

        session.add("2", None).await.unwrap();
        harness.catalog.set_stock("2", None, 3).unwrap();

        session.change_quantity("2", None, 2).await.unwrap();
        assert_eq!(session.lines()[0].quantity, 3);

        let err = session.change_quantity("2", None, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(session.lines()[0].quantity, 3);

        session.change_quantity("2", None, -5).await.unwrap();
        assert_eq!(session.lines()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_pend_and_resume_round_trip() {
        let harness = Harness::new();
        let mut session = harness.session();

        session.add("2", None).await.unwrap();
        session.add("3", None).await.unwrap();
        let before = session.lines().to_vec();

        let id = session.pend(Some("  customer went to ATM ".to_string())).unwrap();
        assert!(session.is_empty());
        assert_eq!(
            session.pending()[0].note.as_deref(),
            Some("customer went to ATM")
        );

        session.resume(&id[..8], false).unwrap();
        assert_eq!(session.lines(), before.as_slice());
        assert!(session.pending().is_empty());

        let err = session.resume(&id, true).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_pend_empty_cart() {
        let harness = Harness::new();
        let mut session = harness.session();

        let err = session.pend(None).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        assert!(session.pending().is_empty());
    }

    #[tokio::test]
    async fn test_resume_refuses_to_displace_active_cart() {
        let harness = Harness::new();
        let mut session = harness.session();

        session.add("2", None).await.unwrap();
        let parked = session.pend(None).unwrap();
        session.add("4", None).await.unwrap();

        let err = session.resume(&parked, false).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        assert_eq!(session.lines()[0].product_id, "4");
        assert_eq!(session.pending().len(), 1);

        session.resume(&parked, true).unwrap();
        assert_eq!(session.lines()[0].product_id, "2");
        assert_eq!(session.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_orders_shared_between_sessions() {
        let harness = Harness::new();
        let mut first = harness.session();
        let mut second = harness.session();

        first.add("2", None).await.unwrap();
        let id = first.pend(None).unwrap();

        second.resume(&id, false).unwrap();
        assert_eq!(second.lines().len(), 1);
        assert!(first.resume(&id, false).is_err());
    }

    #[tokio::test]
    async fn test_invalid_tender_keeps_cart() {
        let harness = Harness::new();
        let mut session = harness.session();
        session.add("2", None).await.unwrap();

        let err = session.checkout("-5", PaymentMethod::Cash).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(session.lines().len(), 1);
        assert!(harness.reports.is_empty());
    }

    #[tokio::test]
    async fn test_reporting_failure_keeps_cart_and_stock() {
        let harness = Harness::new();
        let mut session = harness.session();
        session.add("2", None).await.unwrap();
        harness.reports.set_fail_on_record(true);

        let err = session.checkout("10", PaymentMethod::Card).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ReportingError);
        assert_eq!(session.lines().len(), 1);
        assert_eq!(harness.stock("2", None).await, 50);
    }

    #[tokio::test]
    async fn test_underpayment_becomes_discount() {
        let harness = Harness::new();
        let mut session = harness.session();
        session.add("4", None).await.unwrap();

        // 4.99 + 0.50 tax = 5.49
        let sale = session.checkout("5", PaymentMethod::Cash).await.unwrap();
        assert_eq!(sale.transaction.discount, Money::from_cents(49));
        assert_eq!(sale.transaction.change, Money::zero());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let harness = Harness::new();
        let mut session = harness.session();

        let err = session.checkout("10", PaymentMethod::Cash).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
    }
}
