//! # Settlement Calculator
//!
//! Turns cart lines into totals, and totals plus a tendered amount into
//! change or a discount.
//!
//! ## Settlement Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal = Σ unit_price × quantity                                     │
//! │  tax      = subtotal × rate, rounded half-up to the minor unit          │
//! │  total    = subtotal + tax                                              │
//! │                                                                         │
//! │  paid vs total         discount          change                         │
//! │  ─────────────         ────────          ──────                         │
//! │  paid < total          total − paid      0                              │
//! │  paid > total          0                 paid − total                   │
//! │  paid = total          0                 0                              │
//! │                                                                         │
//! │  Tax is computed once on the subtotal, never per line, so the sum of   │
//! │  per-line rounded taxes never drifts from the order's tax.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::settlement::{Settlement, Totals};
//! use tally_core::types::{Currency, TaxRate};
//!
//! let totals = Totals::from_subtotal(Money::from_cents(3998), TaxRate::from_bps(1000));
//! assert_eq!(totals.total.cents(), 4398);
//!
//! let settlement = Settlement::settle_tender(totals, "50.00", &Currency::usd()).unwrap();
//! assert_eq!(settlement.change.cents(), 602);
//! assert!(settlement.discount.is_zero());
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::error::EngineResult;
use crate::money::Money;
use crate::types::{Currency, TaxRate};

// =============================================================================
// Totals
// =============================================================================

/// Order totals before any payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals for a set of lines.
    pub fn compute(lines: &[CartLine], rate: TaxRate) -> Self {
        let subtotal = lines.iter().map(CartLine::line_total).sum();
        Totals::from_subtotal(subtotal, rate)
    }

    pub fn from_subtotal(subtotal: Money, rate: TaxRate) -> Self {
        let tax = subtotal.calculate_tax(rate);
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// Totals settled against a tendered amount.
///
/// `discount` and `change` are never both non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub paid: Money,
    pub discount: Money,
    pub change: Money,
}

impl Settlement {
    /// Settles `totals` against an already-parsed, non-negative amount.
    pub fn settle(totals: Totals, paid: Money) -> Self {
        let (discount, change) = if paid < totals.total {
            (totals.total - paid, Money::zero())
        } else {
            (Money::zero(), paid - totals.total)
        };

        Settlement {
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            paid,
            discount,
            change,
        }
    }

    /// Parses operator input and settles against it.
    ///
    /// ## Errors
    /// `InvalidTender` for anything that is not a non-negative plain decimal.
    /// No settlement is produced in that case.
    pub fn settle_tender(totals: Totals, input: &str, currency: &Currency) -> EngineResult<Self> {
        let paid = Money::parse(input, currency.decimals)?;
        Ok(Settlement::settle(totals, paid))
    }

    /// Nothing was tendered: the whole total became a discount.
    ///
    /// Accepted as a fully discounted sale; callers may want to log it.
    pub fn is_zero_tender(&self) -> bool {
        self.paid.is_zero() && self.total.is_positive()
    }

    /// What the store actually collected.
    pub fn net_total(&self) -> Money {
        self.total - self.discount
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn fifty() -> Totals {
        Totals {
            subtotal: Money::from_cents(4545),
            tax: Money::from_cents(455),
            total: Money::from_cents(5000),
        }
    }

    #[test]
    fn test_underpayment_becomes_discount() {
        let s = Settlement::settle(fifty(), Money::from_cents(4500));
        assert_eq!(s.discount.cents(), 500);
        assert!(s.change.is_zero());
        assert_eq!(s.net_total().cents(), 4500);
    }

    #[test]
    fn test_overpayment_becomes_change() {
        let s = Settlement::settle(fifty(), Money::from_cents(6000));
        assert_eq!(s.change.cents(), 1000);
        assert!(s.discount.is_zero());
    }

    #[test]
    fn test_exact_payment() {
        let s = Settlement::settle(fifty(), Money::from_cents(5000));
        assert!(s.change.is_zero());
        assert!(s.discount.is_zero());
        assert!(!s.is_zero_tender());
    }

    #[test]
    fn test_zero_tender_is_full_discount() {
        let s = Settlement::settle_tender(fifty(), "0", &Currency::usd()).unwrap();
        assert_eq!(s.discount, s.total);
        assert!(s.is_zero_tender());
        assert!(s.net_total().is_zero());
    }

    #[test]
    fn test_invalid_tender_rejected() {
        let err = Settlement::settle_tender(fifty(), "fifty", &Currency::usd()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTender { .. }));

        let err = Settlement::settle_tender(fifty(), "-5", &Currency::usd()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTender { .. }));
    }

    #[test]
    fn test_tender_uses_currency_decimals() {
        let yen = Currency::from_code("JPY").unwrap();
        let totals = Totals::from_subtotal(Money::from_cents(1000), TaxRate::from_bps(1000));
        assert_eq!(totals.total.cents(), 1100);

        let s = Settlement::settle_tender(totals, "1200", &yen).unwrap();
        assert_eq!(s.change.cents(), 100);
    }

    #[test]
    fn test_subtotal_is_order_invariant() {
        use crate::catalog::tests::{plain, tshirt};
        use crate::cart::Cart;

        let shirt = tshirt();
        let milk = plain("2", "Fresh Milk", 349, 50);
        let mut cart = Cart::new();
        cart.add_item(&shirt, shirt.variant("1-1")).unwrap();
        cart.add_item(&milk, None).unwrap();
        cart.add_item(&milk, None).unwrap();

        let mut reversed = cart.lines().to_vec();
        reversed.reverse();

        let rate = TaxRate::default();
        assert_eq!(Totals::compute(cart.lines(), rate), Totals::compute(&reversed, rate));
        assert_eq!(Totals::compute(cart.lines(), rate).subtotal.cents(), 1999 + 698);
    }

    #[test]
    fn test_tshirt_end_to_end_amounts() {
        use crate::catalog::tests::tshirt;
        use crate::cart::Cart;

        let shirt = tshirt();
        let mut cart = Cart::new();
        cart.add_item(&shirt, shirt.variant("1-1")).unwrap();
        cart.add_item(&shirt, shirt.variant("1-1")).unwrap();

        let totals = Totals::compute(cart.lines(), TaxRate::from_bps(1000));
        assert_eq!(totals.subtotal.cents(), 3998);
        assert_eq!(totals.tax.cents(), 400);
        assert_eq!(totals.total.cents(), 4398);

        let s = Settlement::settle_tender(totals, "50.00", &Currency::usd()).unwrap();
        assert_eq!(s.change.cents(), 602);
    }

    #[test]
    fn test_empty_lines_total_zero() {
        let totals = Totals::compute(&[], TaxRate::default());
        assert_eq!(totals, Totals::default());
    }
}
