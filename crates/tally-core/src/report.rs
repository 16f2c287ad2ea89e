//! # Sales Reports
//!
//! Pure aggregation over transaction history: summary metrics, sales per
//! day and sales per category, for a chosen date range.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  history ──► ReportRange::contains(ts, now) ──► SalesReport::build     │
//! │                                                 ├── summary             │
//! │                                                 ├── by_day   (UTC)      │
//! │                                                 └── by_category         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales figures use the amount actually collected (`net_total`), so a
//! discounted sale counts for what was paid. Category figures are gross
//! line totals before tax.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Transaction;

// =============================================================================
// Report Range
// =============================================================================

/// Which transactions a report covers, relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    /// Same UTC calendar day as now.
    Today,
    /// The last `n` days up to now (7 for "this week").
    LastDays(u32),
    /// Same calendar month and year as now.
    Month,
    /// Same calendar year as now.
    Year,
    /// Inclusive range of UTC dates.
    Custom { start: NaiveDate, end: NaiveDate },
    All,
}

impl ReportRange {
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let date = timestamp.date_naive();
        let today = now.date_naive();

        match *self {
            ReportRange::Today => date == today,
            ReportRange::LastDays(days) => {
                // A window reaching past the earliest representable instant
                // covers everything up to now.
                let since = Duration::try_days(i64::from(days))
                    .and_then(|span| now.checked_sub_signed(span));
                since.map_or(true, |since| timestamp >= since) && timestamp <= now
            }
            ReportRange::Month => date.year() == today.year() && date.month() == today.month(),
            ReportRange::Year => date.year() == today.year(),
            ReportRange::Custom { start, end } => date >= start && date <= end,
            ReportRange::All => true,
        }
    }

    /// Parses operator input: `today`, `week`, `month`, `year`, `all`,
    /// `Nd` (last N days) or `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn parse(input: &str) -> Option<ReportRange> {
        let input = input.trim().to_lowercase();
        match input.as_str() {
            "" | "today" => return Some(ReportRange::Today),
            "week" => return Some(ReportRange::LastDays(7)),
            "month" => return Some(ReportRange::Month),
            "year" => return Some(ReportRange::Year),
            "all" => return Some(ReportRange::All),
            _ => {}
        }

        if let Some(days) = input.strip_suffix('d') {
            return days.parse().ok().map(ReportRange::LastDays);
        }

        let (start, end) = input.split_once("..")?;
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
        (start <= end).then_some(ReportRange::Custom { start, end })
    }
}

// =============================================================================
// Report Types
// =============================================================================

/// Headline metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub total_sales: Money,
    pub order_count: u64,
    pub total_discount: Money,
    /// `total_sales / order_count`, rounded half up; zero with no orders.
    pub average_order_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategorySales {
    pub category: String,
    pub total: Money,
}

/// Everything the reports screen shows for one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub range: ReportRange,
    pub summary: SalesSummary,
    /// Oldest day first.
    pub by_day: Vec<DailySales>,
    /// Alphabetical by category.
    pub by_category: Vec<CategorySales>,
}

impl SalesReport {
    /// Builds a report over the transactions inside `range`.
    pub fn build(history: &[Transaction], range: ReportRange, now: DateTime<Utc>) -> Self {
        let selected: Vec<&Transaction> = history
            .iter()
            .filter(|t| range.contains(t.timestamp, now))
            .collect();

        SalesReport {
            range,
            summary: summarize(&selected),
            by_day: sales_by_day(&selected),
            by_category: sales_by_category(&selected),
        }
    }
}

// =============================================================================
// Aggregations
// =============================================================================

pub fn summarize(transactions: &[&Transaction]) -> SalesSummary {
    let total_sales: Money = transactions.iter().map(|t| t.net_total()).sum();
    let total_discount: Money = transactions.iter().map(|t| t.discount).sum();
    let order_count = transactions.len() as u64;

    let average_order_value = match order_count {
        0 => Money::zero(),
        n => {
            let n = n as i64;
            Money::from_cents((total_sales.cents() + n / 2) / n)
        }
    };

    SalesSummary {
        total_sales,
        order_count,
        total_discount,
        average_order_value,
    }
}

pub fn sales_by_day(transactions: &[&Transaction]) -> Vec<DailySales> {
    let mut days: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    for t in transactions {
        *days.entry(t.timestamp.date_naive()).or_default() += t.net_total();
    }

    days.into_iter()
        .map(|(date, total)| DailySales { date, total })
        .collect()
}

pub fn sales_by_category(transactions: &[&Transaction]) -> Vec<CategorySales> {
    let mut categories: BTreeMap<&str, Money> = BTreeMap::new();
    for line in transactions.iter().flat_map(|t| &t.lines) {
        *categories.entry(line.category.as_str()).or_default() += line.line_total();
    }

    categories
        .into_iter()
        .map(|(category, total)| CategorySales {
            category: category.to_string(),
            total,
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
