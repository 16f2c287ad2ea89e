//! # Configuration State
//!
//! Store settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file)
//!
//! ```text
//! TALLY_STORE_NAME   "My Store"
//! TALLY_CURRENCY     USD            (USD, EUR, GBP, JPY, NGN)
//! TALLY_TAX_RATE     10             percentage, 0 to 100, e.g. "8.25"
//! TALLY_OPERATOR_ID  1
//! TALLY_DB_PATH      ./tally.db
//! ```
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so the session shares
//! it through an `Arc` without a mutex.

use std::path::PathBuf;

use serde::Serialize;
use tally_core::{Currency, Money, OperatorSource, SettingsSource, TaxRate, ValidationError};

/// Terminal configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (shown in the banner and on receipts)
    pub store_name: String,

    pub currency: Currency,

    /// Sales tax in basis points, e.g. 825 = 8.25%
    pub tax_rate_bps: u32,

    /// Operator recorded on every transaction
    pub operator_id: String,

    pub db_path: PathBuf,

    /// Messages the customer display rotates through while the cart is empty
    pub idle_messages: Vec<String>,

    pub receipt_footer: String,
}

impl Default for ConfigState {
    /// ## Default Values
    /// - Store: "My Store"
    /// - Currency: USD ($)
    /// - Tax: 10%
    /// - Operator: "1"
    fn default() -> Self {
        ConfigState {
            store_name: "My Store".to_string(),
            currency: Currency::usd(),
            tax_rate_bps: TaxRate::DEFAULT.bps(),
            operator_id: "1".to_string(),
            db_path: PathBuf::from("./tally.db"),
            idle_messages: vec![
                "Welcome to Our Store!".to_string(),
                "Check out our daily specials!".to_string(),
                "Thank you for shopping with us!".to_string(),
                "Ask our staff about our loyalty program!".to_string(),
            ],
            receipt_footer: "Thank you for shopping with us!".to_string(),
        }
    }
}

impl ConfigState {
    /// Creates a ConfigState from the process environment and defaults.
    ///
    /// ## Errors
    /// A set but unusable `TALLY_CURRENCY` or `TALLY_TAX_RATE` is rejected
    /// rather than silently replaced by the default.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConfigState::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(store_name) = lookup("TALLY_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(code) = lookup("TALLY_CURRENCY") {
            config.currency =
                Currency::from_code(&code).ok_or_else(|| ValidationError::InvalidFormat {
                    field: "TALLY_CURRENCY".to_string(),
                    reason: format!("unsupported currency '{code}'"),
                })?;
        }

        if let Some(rate) = lookup("TALLY_TAX_RATE") {
            config.tax_rate_bps = TaxRate::parse_percentage(&rate)?.bps();
        }

        if let Some(operator_id) = lookup("TALLY_OPERATOR_ID") {
            config.operator_id = operator_id;
        }

        if let Some(path) = lookup("TALLY_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Formats a minor-unit amount in the configured currency.
    ///
    /// ## Example
    /// ```rust
    /// use tally_terminal::config::ConfigState;
    ///
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        self.currency.format(Money::from_cents(cents))
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

impl SettingsSource for ConfigState {
    fn tax_rate(&self) -> TaxRate {
        ConfigState::tax_rate(self)
    }

    fn currency(&self) -> Currency {
        self.currency.clone()
    }
}

impl OperatorSource for ConfigState {
    fn current_operator_id(&self) -> String {
        self.operator_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConfigState::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.store_name, "My Store");
        assert_eq!(config.currency, Currency::usd());
        assert_eq!(config.tax_rate_bps, 1000);
        assert_eq!(config.current_operator_id(), "1");
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigState::from_lookup(lookup(&[
            ("TALLY_STORE_NAME", "Corner Shop"),
            ("TALLY_CURRENCY", "jpy"),
            ("TALLY_TAX_RATE", "8.25"),
            ("TALLY_OPERATOR_ID", "7"),
            ("TALLY_DB_PATH", "/var/lib/tally/pos.db"),
        ]))
        .unwrap();

        assert_eq!(config.store_name, "Corner Shop");
        assert_eq!(config.currency.code, "JPY");
        assert_eq!(config.tax_rate_bps, 825);
        assert_eq!(config.operator_id, "7");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/tally/pos.db"));
        assert_eq!(config.format_currency(1200), "¥1200");
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "0")])).is_ok());
        assert!(ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "100")])).is_ok());
        assert!(ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "100.5")])).is_err());
        assert!(ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "-1")])).is_err());
        assert!(ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "ten")])).is_err());

        let config = ConfigState::from_lookup(lookup(&[("TALLY_TAX_RATE", "8.255")])).unwrap();
        assert_eq!(config.tax_rate_bps, 826);
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let err = ConfigState::from_lookup(lookup(&[("TALLY_CURRENCY", "XYZ")])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_format_currency() {
        let config = ConfigState::default();
        assert_eq!(config.format_currency(1234), "$12.34");
        assert_eq!(config.format_currency(0), "$0.00");
        assert_eq!(config.format_currency(-602), "-$6.02");
    }
}
