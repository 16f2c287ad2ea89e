//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Variant      │   │   Transaction   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, sku        │──►│  id (scoped)    │   │  id (UUID)      │       │
//! │  │  base_price     │   │  price, stock   │   │  lines (frozen) │       │
//! │  │  stock          │   │  attributes     │   │  settlement     │       │
//! │  │  has_variants   │   └─────────────────┘   │  operator_id    │       │
//! │  └─────────────────┘                          └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    Currency     │   │ PaymentMethod   │       │
//! │  │  bps (u32)      │   │  code, symbol   │   │  Cash           │       │
//! │  │  1000 = 10%     │   │  decimals       │   │  Card           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::validate_tax_rate_bps;

/// Attribute name → attribute value, e.g. `{"color": "Red", "size": "S"}`.
///
/// A `BTreeMap` so two variants with the same pairs compare equal and
/// serialize identically regardless of insertion order.
pub type Attributes = BTreeMap<String, String>;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the default 10% rate is 1000 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// The rate used when the settings store supplies none (10%).
    pub const DEFAULT: TaxRate = TaxRate(1000);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Parses a percentage such as `"8.25"` into basis points.
    ///
    /// Exact decimal parsing; a third decimal place rounds half away from
    /// zero, the same way tender amounts do (`8.255` → 826 bps). The result
    /// must lie within 0–100%.
    pub fn parse_percentage(input: &str) -> Result<Self, ValidationError> {
        let pct = Decimal::from_str(input.trim()).map_err(|_| ValidationError::InvalidFormat {
            field: "tax_rate".to_string(),
            reason: format!("'{input}' is not a number"),
        })?;

        let bps = pct
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|d| d.to_u32())
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "tax_rate".to_string(),
                min: 0,
                max: 10000,
            })?;
        validate_tax_rate_bps(bps)?;

        Ok(TaxRate(bps))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::DEFAULT
    }
}

// =============================================================================
// Currency
// =============================================================================

/// A display currency supplied by the settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code.
    pub code: String,
    pub symbol: String,
    /// Digits after the decimal point (2 for USD, 0 for JPY).
    pub decimals: u32,
}

/// Currencies a store can be configured with.
const KNOWN_CURRENCIES: &[(&str, &str, u32)] = &[
    ("USD", "$", 2),
    ("EUR", "€", 2),
    ("GBP", "£", 2),
    ("JPY", "¥", 0),
    ("NGN", "₦", 2),
];

impl Currency {
    /// Looks up a known currency by ISO code (case-insensitive).
    pub fn from_code(code: &str) -> Option<Currency> {
        KNOWN_CURRENCIES
            .iter()
            .find(|(c, _, _)| c.eq_ignore_ascii_case(code.trim()))
            .map(|(code, symbol, decimals)| Currency {
                code: (*code).to_string(),
                symbol: (*symbol).to_string(),
                decimals: *decimals,
            })
    }

    pub fn usd() -> Currency {
        Currency {
            code: "USD".to_string(),
            symbol: "$".to_string(),
            decimals: 2,
        }
    }

    /// Formats an amount for operators and receipts, e.g. `$6.02`.
    pub fn format(&self, amount: Money) -> String {
        let digits = Money::from_cents(amount.cents().abs()).to_decimal_string(self.decimals);
        let sign = if amount.is_negative() { "-" } else { "" };
        format!("{sign}{}{digits}", self.symbol)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::usd()
    }
}

// =============================================================================
// Product & Variant
// =============================================================================

/// A concrete sellable configuration of a product (one color/size pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Unique within the parent product only.
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub attributes: Attributes,
}

impl Variant {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when every pair in `selection` appears in this variant.
    pub fn matches(&self, selection: &Attributes) -> bool {
        selection
            .iter()
            .all(|(name, value)| self.attributes.get(name) == Some(value))
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price of the product itself; variants carry their own price.
    pub base_price_cents: i64,
    pub sku: String,
    pub category: String,
    /// Meaningless when `has_variants`; each variant tracks its own stock.
    pub stock_quantity: i64,
    /// Restock once a unit's stock falls to this level. Applies to each
    /// variant separately.
    #[serde(default)]
    pub reorder_point: i64,
    pub expiry_date: Option<NaiveDate>,
    pub has_variants: bool,
    /// Ordered; non-empty iff `has_variants`.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    /// Finds one of this product's variants by id.
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Stock of the sellable unit: the variant's if given, else the product's.
    pub fn effective_stock(&self, variant: Option<&Variant>) -> i64 {
        variant.map_or(self.stock_quantity, |v| v.stock_quantity)
    }

    /// True when the expiry date is on or before `date`.
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= date)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }

    /// Parses operator input; accepts a few common card synonyms.
    pub fn parse(input: &str) -> Option<PaymentMethod> {
        match input.trim().to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" | "credit" | "debit" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A finalized sale. Never mutated after creation, only appended to history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
    pub tax: Money,
    /// subtotal + tax, before any discount.
    pub total: Money,
    pub discount: Money,
    pub amount_paid: Money,
    pub change: Money,
    pub payment_method: PaymentMethod,
    pub operator_id: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// What the store actually collected: total minus any discount.
    pub fn net_total(&self) -> Money {
        self.total - self.discount
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_conversions() {
        assert_eq!(TaxRate::parse_percentage("8.25").unwrap().bps(), 825);
        assert_eq!(TaxRate::parse_percentage(" 10 ").unwrap().bps(), 1000);
        assert_eq!(TaxRate::parse_percentage("8.255").unwrap().bps(), 826);
        assert_eq!(TaxRate::parse_percentage("8.2549").unwrap().bps(), 825);
        assert_eq!(TaxRate::parse_percentage("-0").unwrap().bps(), 0);
        assert!(matches!(
            TaxRate::parse_percentage("-1"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            TaxRate::parse_percentage("100.01"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            TaxRate::parse_percentage("NaN"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert_eq!(TaxRate::default(), TaxRate::from_bps(1000));
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_currency_lookup_and_format() {
        let usd = Currency::from_code("usd").unwrap();
        assert_eq!(usd.format(Money::from_cents(602)), "$6.02");
        assert_eq!(usd.format(Money::from_cents(-550)), "-$5.50");

        let yen = Currency::from_code("JPY").unwrap();
        assert_eq!(yen.decimals, 0);
        assert_eq!(yen.format(Money::from_cents(1500)), "¥1500");

        assert!(Currency::from_code("XYZ").is_none());
    }

    #[test]
    fn test_variant_matches_partial_selection() {
        let variant = Variant {
            id: "1-1".to_string(),
            name: "T-Shirt - Red, Small".to_string(),
            sku: "CLOTH001-R-S".to_string(),
            price_cents: 1999,
            stock_quantity: 20,
            attributes: Attributes::from([
                ("color".to_string(), "Red".to_string()),
                ("size".to_string(), "S".to_string()),
            ]),
        };

        let mut selection = Attributes::new();
        assert!(variant.matches(&selection));
        selection.insert("color".to_string(), "Red".to_string());
        assert!(variant.matches(&selection));
        selection.insert("size".to_string(), "M".to_string());
        assert!(!variant.matches(&selection));
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("Cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("debit"), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::parse("cheque"), None);
    }
}
