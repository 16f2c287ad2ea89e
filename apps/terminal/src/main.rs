//! # Tally Terminal Entry Point
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Terminal Startup                                  │
//! │                                                                         │
//! │  1. Initialize Logging ── tracing-subscriber, RUST_LOG or default      │
//! │  2. Load ConfigState ──── TALLY_* environment over defaults            │
//! │  3. Open Database ─────── --db, else TALLY_DB_PATH; WAL + migrations   │
//! │  4. Seed (--seed) ─────── demo catalog when the catalog is empty       │
//! │  5. Build Session ─────── CatalogRepository + TransactionRepository    │
//! │  6. Prompt ────────────── one command per stdin line until quit/EOF    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tally_core::report::SalesReport;
use tally_core::SuspensionStore;
use tally_db::seed::seed_demo;
use tally_db::{Database, DbConfig};
use tally_terminal::commands::HELP;
use tally_terminal::{
    Command, ConfigState, IdleRotation, TerminalResult, TerminalSession, TracingDisplay,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tally-terminal", about = "Tally POS operator terminal")]
struct Cli {
    /// Database file path (overrides TALLY_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Load the demo catalog if the database has no products
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = ConfigState::from_env()?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());

    info!(store = %config.store_name, db = %db_path.display(), "Starting Tally terminal");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    if cli.seed {
        seed_demo(&db).await?;
    }

    let config = Arc::new(config);
    let display = Arc::new(TracingDisplay::new(
        config.currency.clone(),
        IdleRotation::new(config.idle_messages.clone()),
    ));
    let mut session = TerminalSession::new(
        Arc::new(db.catalog()),
        Arc::new(db.transactions()),
        config.clone(),
        config.clone(),
        display,
        SuspensionStore::new(),
    );

    println!("{} (type 'help')", config.store_name);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        debug!(?command, "Command received");

        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(&mut session, &db, &config, command).await {
            println!("{e}");
        }
    }

    if !session.pending().is_empty() {
        warn!(count = session.pending().len(), "Exiting with pending orders");
    }
    db.close().await;
    Ok(())
}

/// Runs one command against the session and prints the outcome.
async fn execute(
    session: &mut TerminalSession,
    db: &Database,
    config: &ConfigState,
    command: Command,
) -> TerminalResult<()> {
    match command {
        Command::Add {
            product_id,
            variant_id,
        } => {
            session.add(&product_id, variant_id.as_deref()).await?;
            print_cart(session, config);
        }
        Command::Pick {
            product_id,
            choices,
        } => {
            let mut status = None;
            for (attribute, value) in &choices {
                status = Some(session.select_attribute(&product_id, attribute, value).await?);
            }
            if let Some(status) = status {
                for (attribute, values) in &status.options {
                    let chosen = status.chosen.get(attribute).map(String::as_str).unwrap_or("-");
                    println!("  {attribute:<8} {chosen:<8} [{}]", values.join(", "));
                }
                match status.resolved {
                    Some(variant) => println!(
                        "  → {} {} ({} in stock); 'add {product_id}' to add",
                        variant.id,
                        variant.name,
                        variant.stock_quantity
                    ),
                    None => println!("  → selection incomplete"),
                }
            }
        }
        Command::Qty { key, delta } => {
            session
                .change_quantity(&key.product_id, key.variant_id.as_deref(), delta)
                .await?;
            print_cart(session, config);
        }
        Command::Remove { key } => {
            session.remove(&key.product_id, key.variant_id.as_deref());
            print_cart(session, config);
        }
        Command::Clear => {
            session.clear();
            println!("Cart cleared");
        }
        Command::Total => print_cart(session, config),
        Command::Pay { tender, method } => {
            let sale = session.checkout(&tender, method).await?;
            let tx = &sale.transaction;
            println!("Sale {} ({method})", tx.id);
            println!("  Total     {:>12}", config.format_currency(tx.total.cents()));
            println!("  Paid      {:>12}", config.format_currency(tx.amount_paid.cents()));
            if tx.discount.is_positive() {
                println!("  Discount  {:>12}", config.format_currency(tx.discount.cents()));
            }
            println!("  Change    {:>12}", config.format_currency(tx.change.cents()));
            for warning in &sale.stock_warnings {
                println!("  ! stock not updated for {}: {}", warning.sku, warning.error);
            }
            println!("{}", config.receipt_footer);
        }
        Command::Pend { note } => {
            let id = session.pend(note)?;
            println!("Pended as {id}");
        }
        Command::Pending => {
            let pending = session.pending();
            if pending.is_empty() {
                println!("No pending orders");
            }
            for order in pending {
                println!(
                    "  {}  {}  {} lines, {} items  {}",
                    order.id,
                    order.created_at.format("%H:%M"),
                    order.line_count,
                    order.total_quantity,
                    order.note.as_deref().unwrap_or("")
                );
            }
        }
        Command::Resume { id, pend_current } => {
            session.resume(&id, pend_current)?;
            print_cart(session, config);
        }
        Command::Search { query } => {
            let catalog = session.catalog().await?;
            for product in catalog.search(&query) {
                let stock: i64 = if product.has_variants {
                    product.variants.iter().map(|v| v.stock_quantity).sum()
                } else {
                    product.stock_quantity
                };
                println!(
                    "  {:<4} {:<20} {:>10}  stock {}",
                    product.id,
                    product.name,
                    config.format_currency(product.base_price_cents),
                    stock
                );
                for variant in &product.variants {
                    println!(
                        "       {:<5} {:<28} stock {}",
                        variant.id, variant.name, variant.stock_quantity
                    );
                }
            }
        }
        Command::Report { range } => {
            let history = db.transactions().list_all().await?;
            let report = SalesReport::build(&history, range, Utc::now());
            let summary = &report.summary;
            println!("Report {:?}", report.range);
            println!("  Sales     {:>12}", config.format_currency(summary.total_sales.cents()));
            println!("  Orders    {:>12}", summary.order_count);
            println!("  Discounts {:>12}", config.format_currency(summary.total_discount.cents()));
            println!(
                "  Average   {:>12}",
                config.format_currency(summary.average_order_value.cents())
            );
            for day in &report.by_day {
                println!("  {}  {:>12}", day.date, config.format_currency(day.total.cents()));
            }
            for category in &report.by_category {
                println!(
                    "  {:<10} {:>12}",
                    category.category,
                    config.format_currency(category.total.cents())
                );
            }
        }
        Command::Stock { key, quantity } => {
            db.catalog()
                .set_stock(&key.product_id, key.variant_id.as_deref(), quantity)
                .await?;
            println!("Stock for {key} set to {quantity}");
        }
        Command::Reorder { product_id, level } => {
            db.catalog().set_reorder_point(&product_id, level).await?;
            println!("Reorder point for {product_id} set to {level}");
        }
        Command::Low { threshold } => {
            let catalog = session.catalog().await?;
            let levels = match threshold {
                Some(threshold) => catalog.low_stock(threshold),
                None => catalog.needs_reorder(),
            };
            if levels.is_empty() {
                println!("Nothing to restock");
            }
            for level in levels {
                println!(
                    "  {:<8} {:<28} stock {:>4}  reorder at {}",
                    level.key.to_string(),
                    level.name,
                    level.stock_quantity,
                    level.reorder_point
                );
            }
        }
        Command::Expiring { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let catalog = session.catalog().await?;
            let expiring = catalog.expiring_on_or_before(date);
            if expiring.is_empty() {
                println!("Nothing expires on or before {date}");
            }
            for product in expiring {
                let expiry = product
                    .expiry_date
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!("  {:<4} {:<20} expires {expiry}", product.id, product.name);
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }

    Ok(())
}

fn print_cart(session: &TerminalSession, config: &ConfigState) {
    if session.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in session.lines() {
        println!(
            "  {:<8} {:<28} {:>3} × {:>9} {:>10}",
            line.key().to_string(),
            line.name,
            line.quantity,
            config.format_currency(line.unit_price_cents),
            config.format_currency(line.line_total().cents())
        );
    }

    let totals = session.totals();
    println!("  Subtotal  {:>12}", config.format_currency(totals.subtotal.cents()));
    println!(
        "  Tax {:>5}% {:>12}",
        config.tax_rate().percentage(),
        config.format_currency(totals.tax.cents())
    );
    println!("  Total     {:>12}", config.format_currency(totals.total.cents()));
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally::display=debug` - Show display frames as JSON
/// - Default: `info,tally=debug,sqlx=warn`
///
/// Logs go to stderr so they never interleave with the prompt on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
