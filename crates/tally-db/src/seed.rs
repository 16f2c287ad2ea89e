//! # Demo Catalog
//!
//! The products a fresh terminal database is seeded with: one
//! multi-variant product and three plain grocery items.
//!
//! ```text
//! ┌──────┬───────────────────┬───────────┬──────────┬─────────────────────┐
//! │ id   │ name              │ sku       │ price    │ stock               │
//! ├──────┼───────────────────┼───────────┼──────────┼─────────────────────┤
//! │ 1    │ T-Shirt           │ CLOTH001  │ 19.99    │ per variant:        │
//! │      │                   │           │          │  Red/S 20  Red/M 30 │
//! │      │                   │           │          │  Blue/S 25 Blue/M 25│
//! │ 2    │ Fresh Milk        │ DAIRY001  │ 3.49     │ 50                  │
//! │ 3    │ Organic Bananas   │ FRUIT001  │ 2.99     │ 100                 │
//! │ 4    │ Whole Grain Bread │ BAKERY001 │ 4.99     │ 30                  │
//! └──────┴───────────────────┴───────────┴──────────┴─────────────────────┘
//! ```

use chrono::NaiveDate;
use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use tally_core::{Attributes, Product, Variant};

fn tshirt_variant(id: &str, color: &str, size: &str, stock: i64) -> Variant {
    let size_name = if size == "S" { "Small" } else { "Medium" };
    Variant {
        id: id.to_string(),
        name: format!("T-Shirt - {color}, {size_name}"),
        sku: format!("CLOTH001-{}-{size}", &color[..1]),
        price_cents: 1999,
        stock_quantity: stock,
        attributes: Attributes::from([
            ("color".to_string(), color.to_string()),
            ("size".to_string(), size.to_string()),
        ]),
    }
}

fn grocery(
    id: &str,
    name: &str,
    sku: &str,
    category: &str,
    price_cents: i64,
    stock: i64,
    reorder_point: i64,
    expiry: Option<NaiveDate>,
) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        base_price_cents: price_cents,
        sku: sku.to_string(),
        category: category.to_string(),
        stock_quantity: stock,
        reorder_point,
        expiry_date: expiry,
        has_variants: false,
        variants: Vec::new(),
    }
}

/// The demo catalog, in display order.
pub fn demo_catalog() -> Vec<Product> {
    vec![
        Product {
            id: "1".to_string(),
            name: "T-Shirt".to_string(),
            base_price_cents: 1999,
            sku: "CLOTH001".to_string(),
            category: "Clothing".to_string(),
            stock_quantity: 100,
            reorder_point: 10,
            expiry_date: None,
            has_variants: true,
            variants: vec![
                tshirt_variant("1-1", "Red", "S", 20),
                tshirt_variant("1-2", "Red", "M", 30),
                tshirt_variant("1-3", "Blue", "S", 25),
                tshirt_variant("1-4", "Blue", "M", 25),
            ],
        },
        grocery("2", "Fresh Milk", "DAIRY001", "Dairy", 349, 50, 15, NaiveDate::from_ymd_opt(2024, 1, 28)),
        grocery("3", "Organic Bananas", "FRUIT001", "Fruits", 299, 100, 20, NaiveDate::from_ymd_opt(2024, 2, 15)),
        grocery("4", "Whole Grain Bread", "BAKERY001", "Bakery", 499, 30, 10, NaiveDate::from_ymd_opt(2024, 1, 20)),
    ]
}

/// Inserts the demo catalog unless the database already has products.
///
/// Returns the number of products inserted (0 when skipped).
pub async fn seed_demo(db: &Database) -> DbResult<usize> {
    let existing = db.catalog().count().await?;
    if existing > 0 {
        info!(existing, "Catalog already populated, skipping seed");
        return Ok(0);
    }

    let products = demo_catalog();
    for product in &products {
        db.catalog().insert(product).await?;
    }

    info!(count = products.len(), "Demo catalog seeded");
    Ok(products.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(seed_demo(&db).await.unwrap(), 4);
        assert_eq!(seed_demo(&db).await.unwrap(), 0);
        assert_eq!(db.catalog().count().await.unwrap(), 4);
    }

    #[test]
    fn test_demo_skus() {
        let catalog = demo_catalog();
        let skus: Vec<_> = catalog[0].variants.iter().map(|v| v.sku.as_str()).collect();
        assert_eq!(
            skus,
            vec!["CLOTH001-R-S", "CLOTH001-R-M", "CLOTH001-B-S", "CLOTH001-B-M"]
        );
        assert_eq!(catalog[0].variants[0].name, "T-Shirt - Red, Small");
    }
}
