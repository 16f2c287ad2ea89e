//! # tally-db: Database Layer for Tally POS
//!
//! SQLite storage for the catalog and the transaction history, exposed to
//! the engine through tally-core's `CatalogStore` and `ReportSink` traits.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  TerminalSession (checkout)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Recorder ── Arc<dyn CatalogStore> / Arc<dyn ReportSink>               │
//! │       │                                                                 │
//! │  ┌────▼────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │    Repositories    │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ CatalogRepository  │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ TransactionRepo    │  │ 001_init   │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL mode)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let catalog = db.catalog().load().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, Storage};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::transaction::TransactionRepository;
