//! # Catalog Repository
//!
//! Products, variants and their stock, plus the atomic stock decrement the
//! recorder issues at checkout.
//!
//! ## Compare-and-Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Terminal A and B both sell the last Fresh Milk (stock = 1)             │
//! │                                                                         │
//! │  A: UPDATE products SET stock_quantity = stock_quantity - 1             │
//! │     WHERE id = '2' AND stock_quantity >= 1      → 1 row  ✓ stock = 0    │
//! │                                                                         │
//! │  B: UPDATE products SET stock_quantity = stock_quantity - 1             │
//! │     WHERE id = '2' AND stock_quantity >= 1      → 0 rows                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT stock_quantity ... → row exists → StockConflict (available 0)  │
//! │                            → no row     → MissingStockRecord           │
//! │                                                                         │
//! │  The check and the write are ONE statement; stock never goes negative. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use tally_core::validation::validate_product;
use tally_core::{
    Attributes, Catalog, CatalogError, CatalogStore, Product, StockConflict, ValidationError,
    Variant,
};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    sku: String,
    category: String,
    base_price_cents: i64,
    stock_quantity: i64,
    reorder_point: i64,
    expiry_date: Option<NaiveDate>,
    has_variants: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    product_id: String,
    id: String,
    name: String,
    sku: String,
    price_cents: i64,
    stock_quantity: i64,
    attributes: String,
}

impl VariantRow {
    fn into_variant(self) -> DbResult<Variant> {
        let attributes: Attributes = serde_json::from_str(&self.attributes)?;
        Ok(Variant {
            id: self.id,
            name: self.name,
            sku: self.sku,
            price_cents: self.price_cents,
            stock_quantity: self.stock_quantity,
            attributes,
        })
    }
}

/// Repository for catalog reads and stock writes.
///
/// ## Usage
/// ```rust,ignore
/// let repo = CatalogRepository::new(pool);
/// repo.insert(&product).await?;
/// let catalog = repo.load().await?;
/// repo.decrement_stock("1", Some("1-1"), 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a product and its variants in one database transaction.
    ///
    /// The product is validated first; nothing is written if it is invalid.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, sku = %product.sku, variants = product.variants.len(), "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, category, base_price_cents,
                stock_quantity, reorder_point, expiry_date, has_variants
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(product.base_price_cents)
        .bind(product.stock_quantity)
        .bind(product.reorder_point)
        .bind(product.expiry_date)
        .bind(product.has_variants)
        .execute(&mut *tx)
        .await?;

        for variant in &product.variants {
            let attributes = serde_json::to_string(&variant.attributes)?;
            sqlx::query(
                r#"
                INSERT INTO product_variants (
                    product_id, id, name, sku, price_cents, stock_quantity, attributes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&product.id)
            .bind(&variant.id)
            .bind(&variant.name)
            .bind(&variant.sku)
            .bind(variant.price_cents)
            .bind(variant.stock_quantity)
            .bind(attributes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Loads every product with its variants, in insertion order, as a
    /// validated snapshot.
    pub async fn load(&self) -> DbResult<Catalog> {
        let product_rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, sku, category, base_price_cents,
                   stock_quantity, reorder_point, expiry_date, has_variants
            FROM products
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let variant_rows: Vec<VariantRow> = sqlx::query_as(
            r#"
            SELECT product_id, id, name, sku, price_cents, stock_quantity, attributes
            FROM product_variants
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut variants: HashMap<String, Vec<Variant>> = HashMap::new();
        for row in variant_rows {
            let product_id = row.product_id.clone();
            variants
                .entry(product_id)
                .or_default()
                .push(row.into_variant()?);
        }

        let products = product_rows
            .into_iter()
            .map(|row| Product {
                variants: variants.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                base_price_cents: row.base_price_cents,
                sku: row.sku,
                category: row.category,
                stock_quantity: row.stock_quantity,
                reorder_point: row.reorder_point,
                expiry_date: row.expiry_date,
                has_variants: row.has_variants,
            })
            .collect();

        debug!("Catalog snapshot loaded");
        Ok(Catalog::new(products)?)
    }

    /// Subtracts `quantity` from one stock record, or fails without writing.
    ///
    /// ## Errors
    /// - `StockConflict` when fewer than `quantity` units remain
    /// - `MissingStockRecord` when the product or variant does not exist
    pub async fn decrement_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, variant_id = ?variant_id, quantity, "Decrementing stock");

        let result = match variant_id {
            Some(variant_id) => {
                sqlx::query(
                    r#"
                    UPDATE product_variants
                    SET stock_quantity = stock_quantity - ?1
                    WHERE product_id = ?2 AND id = ?3 AND stock_quantity >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(product_id)
                .bind(variant_id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET stock_quantity = stock_quantity - ?1
                    WHERE id = ?2 AND stock_quantity >= ?1
                    "#,
                )
                .bind(quantity)
                .bind(product_id)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.stock_of(product_id, variant_id).await? {
            Some(available) => {
                warn!(product_id = %product_id, variant_id = ?variant_id, requested = quantity, available, "Stock conflict");
                Err(DbError::StockConflict(StockConflict {
                    product_id: product_id.to_string(),
                    variant_id: variant_id.map(str::to_string),
                    requested: quantity,
                    available,
                }))
            }
            None => Err(DbError::MissingStockRecord {
                product_id: product_id.to_string(),
                variant_id: variant_id.map(str::to_string),
            }),
        }
    }

    /// Overwrites one stock record (deliveries, recounts).
    pub async fn set_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> DbResult<()> {
        tally_core::validation::validate_stock(quantity)?;

        let result = match variant_id {
            Some(variant_id) => {
                sqlx::query(
                    "UPDATE product_variants SET stock_quantity = ?1 WHERE product_id = ?2 AND id = ?3",
                )
                .bind(quantity)
                .bind(product_id)
                .bind(variant_id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query("UPDATE products SET stock_quantity = ?1 WHERE id = ?2")
                    .bind(quantity)
                    .bind(product_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(DbError::MissingStockRecord {
                product_id: product_id.to_string(),
                variant_id: variant_id.map(str::to_string),
            });
        }

        info!(product_id = %product_id, variant_id = ?variant_id, quantity, "Stock set");
        Ok(())
    }

    /// Sets the level at which a product should be restocked.
    pub async fn set_reorder_point(&self, product_id: &str, reorder_point: i64) -> DbResult<()> {
        if reorder_point < 0 {
            return Err(DbError::Validation(ValidationError::OutOfRange {
                field: "reorder point".to_string(),
                min: 0,
                max: i64::MAX,
            }));
        }

        let result = sqlx::query("UPDATE products SET reorder_point = ?1 WHERE id = ?2")
            .bind(reorder_point)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        info!(product_id = %product_id, reorder_point, "Reorder point set");
        Ok(())
    }

    /// Current stock of one record, `None` if it does not exist.
    pub async fn stock_of(&self, product_id: &str, variant_id: Option<&str>) -> DbResult<Option<i64>> {
        let stock: Option<i64> = match variant_id {
            Some(variant_id) => {
                sqlx::query_scalar(
                    "SELECT stock_quantity FROM product_variants WHERE product_id = ?1 AND id = ?2",
                )
                .bind(product_id)
                .bind(variant_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(stock)
    }

    /// Number of products in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn snapshot(&self) -> Result<Catalog, CatalogError> {
        Ok(self.load().await?)
    }

    async fn decrement_stock(
        &self,
        product_id: &str,
        variant_id: Option<&str>,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        Ok(CatalogRepository::decrement_stock(self, product_id, variant_id, quantity).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
