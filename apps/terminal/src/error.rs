//! # Terminal Error Type
//!
//! Unified error type for operator commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Tally POS                              │
//! │                                                                         │
//! │  Operator types `pay 45`                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  TerminalSession method → Result<T, TerminalError>               │  │
//! │  │         │                                                        │  │
//! │  │  Engine error? ───── EngineError::StockExceeded ───┐            │  │
//! │  │         │                                          │            │  │
//! │  │  Database error? ─── DbError::QueryFailed ─────────┤            │  │
//! │  │         │                                          ▼            │  │
//! │  │  Config error? ───── ValidationError ─────── TerminalError ────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄──── "[INSUFFICIENT_STOCK] Cannot add more CLOTH001-R-S: ..."         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tally_core::{CatalogError, EngineError, ValidationError};
use tally_db::DbError;

/// Error returned from terminal commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Cannot add more CLOTH001-R-S: available 20, requested 21"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for terminal responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, variant or pending order not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Variant selection missing or ambiguous
    SelectionError,

    /// Cart operation refused (empty cart, occupied cart)
    CartError,

    /// Insufficient stock
    InsufficientStock,

    /// Tender could not be parsed
    PaymentError,

    /// History did not accept the sale
    ReportingError,

    /// Database or catalog store failed
    DatabaseError,

    /// Operator typed something the terminal does not understand
    UnknownCommand,

    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::SelectionError => "SELECTION_ERROR",
            ErrorCode::CartError => "CART_ERROR",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::PaymentError => "PAYMENT_ERROR",
            ErrorCode::ReportingError => "REPORTING_ERROR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::UnknownCommand => "UNKNOWN_COMMAND",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl TerminalError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        TerminalError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::ValidationError, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::CartError, message)
    }

    pub fn unknown_command(message: impl Into<String>) -> Self {
        TerminalError::new(ErrorCode::UnknownCommand, message)
    }
}

/// Converts engine errors to terminal errors.
impl From<EngineError> for TerminalError {
    fn from(err: EngineError) -> Self {
        let code = match &err {
            EngineError::VariantRequired { .. }
            | EngineError::IncompleteSelection { .. }
            | EngineError::UnknownVariant { .. } => ErrorCode::SelectionError,
            EngineError::ProductNotFound(_) | EngineError::NotFound(_) => ErrorCode::NotFound,
            EngineError::OutOfStock { .. }
            | EngineError::StockExceeded { .. }
            | EngineError::StockConflict(_) => ErrorCode::InsufficientStock,
            EngineError::InvalidTender { .. } => ErrorCode::PaymentError,
            EngineError::EmptyCart => ErrorCode::CartError,
            EngineError::Catalog(_) => ErrorCode::DatabaseError,
            EngineError::ReportingFailed(e) => {
                tracing::error!(error = %e, "Transaction history rejected sale");
                ErrorCode::ReportingError
            }
            EngineError::Validation(_) => ErrorCode::ValidationError,
        };

        TerminalError::new(code, err.to_string())
    }
}

impl From<CatalogError> for TerminalError {
    fn from(err: CatalogError) -> Self {
        TerminalError::from(EngineError::from(err))
    }
}

impl From<ValidationError> for TerminalError {
    fn from(err: ValidationError) -> Self {
        TerminalError::validation(err.to_string())
    }
}

/// Converts database errors to terminal errors.
impl From<DbError> for TerminalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                TerminalError::new(ErrorCode::NotFound, format!("{entity} not found: {id}"))
            }
            DbError::Validation(e) => TerminalError::from(e),
            DbError::UniqueViolation { .. } => TerminalError::validation(err.to_string()),
            DbError::MissingStockRecord { .. } => {
                TerminalError::new(ErrorCode::NotFound, err.to_string())
            }
            DbError::StockConflict(conflict) => {
                TerminalError::from(EngineError::StockConflict(conflict))
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Database operation failed");
                TerminalError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for TerminalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for TerminalError {}

pub type TerminalResult<T> = Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_codes() {
        let err = TerminalError::from(EngineError::VariantRequired {
            product_id: "1".to_string(),
        });
        assert_eq!(err.code, ErrorCode::SelectionError);

        let err = TerminalError::from(EngineError::StockExceeded {
            sku: "CLOTH001-R-S".to_string(),
            available: 20,
            requested: 21,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.to_string(),
            "[INSUFFICIENT_STOCK] Cannot add more CLOTH001-R-S: available 20, requested 21"
        );

        assert_eq!(
            TerminalError::from(EngineError::EmptyCart).code,
            ErrorCode::CartError
        );
    }

    #[test]
    fn test_catalog_error_goes_through_engine_mapping() {
        let err = TerminalError::from(CatalogError::Unavailable("disk full".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_db_error_hides_internals() {
        let err = TerminalError::from(DbError::QueryFailed("near \"SELEC\": syntax".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
    }

    #[test]
    fn test_inventory_db_errors_reach_operator() {
        let err = TerminalError::from(DbError::MissingStockRecord {
            product_id: "1".to_string(),
            variant_id: Some("1-9".to_string()),
        });
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Stock record not found: 1/1-9");

        let err = TerminalError::from(DbError::not_found("Product", "404"));
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_serializes_code_and_message() {
        let err = TerminalError::cart("Cart is empty");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CART_ERROR");
        assert_eq!(json["message"], "Cart is empty");
    }
}
