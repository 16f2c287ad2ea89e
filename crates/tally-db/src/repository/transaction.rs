//! # Transaction Repository
//!
//! Append-only history of finalized sales. Lines are frozen cart lines
//! stored as one JSON column; amounts are INTEGER minor units.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Recorder::finalize()                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ReportSink::record(&tx) ──► INSERT INTO transactions  (never updated)  │
//! │                                                                         │
//! │  Reports screen                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  list_since(start) ──► Vec<Transaction> ──► SalesReport::build()        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use tally_core::{CartLine, Money, PaymentMethod, ReportError, ReportSink, Transaction};

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    lines: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    discount_cents: i64,
    amount_paid_cents: i64,
    change_cents: i64,
    payment_method: String,
    operator_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> DbResult<Self> {
        let lines: Vec<CartLine> = serde_json::from_str(&row.lines)?;
        let payment_method = PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
            DbError::InvalidData(format!("unknown payment method '{}'", row.payment_method))
        })?;

        Ok(Transaction {
            id: row.id,
            lines,
            subtotal: Money::from_cents(row.subtotal_cents),
            tax: Money::from_cents(row.tax_cents),
            total: Money::from_cents(row.total_cents),
            discount: Money::from_cents(row.discount_cents),
            amount_paid: Money::from_cents(row.amount_paid_cents),
            change: Money::from_cents(row.change_cents),
            payment_method,
            operator_id: row.operator_id,
            timestamp: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, lines, subtotal_cents, tax_cents, total_cents, discount_cents,
           amount_paid_cents, change_cents, payment_method, operator_id, created_at
    FROM transactions
"#;

/// Repository for the transaction history.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Appends a finalized transaction.
    pub async fn insert(&self, transaction: &Transaction) -> DbResult<()> {
        let lines = serde_json::to_string(&transaction.lines)?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, lines, subtotal_cents, tax_cents, total_cents, discount_cents,
                amount_paid_cents, change_cents, payment_method, operator_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&transaction.id)
        .bind(lines)
        .bind(transaction.subtotal.cents())
        .bind(transaction.tax.cents())
        .bind(transaction.total.cents())
        .bind(transaction.discount.cents())
        .bind(transaction.amount_paid.cents())
        .bind(transaction.change.cents())
        .bind(transaction.payment_method.as_str())
        .bind(&transaction.operator_id)
        .bind(transaction.timestamp)
        .execute(&self.pool)
        .await?;

        info!(
            id = %transaction.id,
            total = %transaction.total,
            method = %transaction.payment_method,
            "Transaction recorded"
        );
        Ok(())
    }

    /// Gets a transaction by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Transactions at or after `since`, oldest first.
    pub async fn list_since(&self, since: DateTime<Utc>) -> DbResult<Vec<Transaction>> {
        debug!(since = %since, "Listing transactions");

        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE created_at >= ?1 ORDER BY created_at, rowid"
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// The whole history, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at, rowid"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ReportSink for TransactionRepository {
    async fn record(&self, transaction: &Transaction) -> Result<(), ReportError> {
        self.insert(transaction).await.map_err(|err| match err {
            DbError::UniqueViolation { .. } => ReportError::Duplicate(transaction.id.clone()),
            other => ReportError::Unavailable(other.to_string()),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{Database, DbConfig};
    use tally_core::Attributes;

    fn sample(id: &str, timestamp: DateTime<Utc>) -> Transaction {
        let line = CartLine {
            product_id: "1".to_string(),
            variant_id: Some("1-1".to_string()),
            sku: "CLOTH001-R-S".to_string(),
            name: "T-Shirt - Red, Small".to_string(),
            category: "Clothing".to_string(),
            unit_price_cents: 1999,
            quantity: 2,
            attributes: Attributes::from([
                ("color".to_string(), "Red".to_string()),
                ("size".to_string(), "S".to_string()),
            ]),
            added_at: timestamp,
        };

        Transaction {
            id: id.to_string(),
            lines: vec![line],
            subtotal: Money::from_cents(3998),
            tax: Money::from_cents(400),
            total: Money::from_cents(4398),
            discount: Money::zero(),
            amount_paid: Money::from_cents(5000),
            change: Money::from_cents(602),
            payment_method: PaymentMethod::Cash,
            operator_id: "1".to_string(),
            timestamp,
        }
    }

    async fn repo() -> TransactionRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .transactions()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let repo = repo().await;
        let tx = sample("t-1", Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());

        repo.insert(&tx).await.unwrap();

        assert_eq!(repo.get_by_id("t-1").await.unwrap(), Some(tx));
        assert_eq!(repo.get_by_id("missing").await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_history_is_append_only() {
        let repo = repo().await;
        let tx = sample("t-1", Utc::now());

        repo.insert(&tx).await.unwrap();
        let err = repo.insert(&tx).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_since() {
        let repo = repo().await;
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();

        repo.insert(&sample("old", base - Duration::days(10))).await.unwrap();
        repo.insert(&sample("new", base)).await.unwrap();
        repo.insert(&sample("newer", base + Duration::hours(1))).await.unwrap();

        let recent = repo.list_since(base - Duration::days(1)).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "newer"]);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_report_sink_records() {
        let repo = repo().await;
        ReportSink::record(&repo, &sample("t-9", Utc::now()))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        let err = ReportSink::record(&repo, &sample("t-9", Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(err, ReportError::Duplicate("t-9".to_string()));
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
