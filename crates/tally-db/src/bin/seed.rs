//! # Demo Catalog Seeder
//!
//! Populates a terminal database with the demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db (default)
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Seeding is skipped when the catalog already has products; delete the
//! database file to regenerate.

use std::path::PathBuf;

use clap::Parser;
use tally_db::seed::{demo_catalog, seed_demo};
use tally_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Tally POS demo catalog seeder")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./tally_dev.db")]
    db: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args = Args::parse();

    println!("Tally POS Demo Seeder");
    println!("=====================");
    println!("Database: {}", args.db.display());
    println!();

    let db = Database::new(DbConfig::new(&args.db)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let inserted = seed_demo(&db).await?;
    if inserted == 0 {
        println!("⚠ Catalog already has products, nothing inserted");
        db.close().await;
        return Ok(());
    }

    println!();
    for product in demo_catalog() {
        let units = if product.has_variants {
            format!("{} variants", product.variants.len())
        } else {
            format!("stock {}", product.stock_quantity)
        };
        println!(
            "  {:<10} {:<20} {:<12} reorder at {}",
            product.sku, product.name, units, product.reorder_point
        );
    }

    let reorder = db.catalog().load().await?.needs_reorder();
    println!();
    println!("✓ Seeded {inserted} products ({} units at or below their reorder point)", reorder.len());

    db.close().await;
    Ok(())
}
