//! # Database Handle
//!
//! Opens the store's SQLite database and hands out repositories.
//!
//! ## Storage
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Storage::File(path) ── one file shared by every terminal in the store │
//! │       │                  WAL journal, busy timeout, pool of 4           │
//! │       │                                                                 │
//! │  Storage::Memory ─────── private database, gone with the pool           │
//! │       │                  single connection (tests, demos)               │
//! │       ▼                                                                 │
//! │  Database::new(config).await ── connect + migrate                       │
//! │       │                                                                 │
//! │       ├──► db.catalog()       CatalogRepository (CatalogStore)          │
//! │       └──► db.transactions()  TransactionRepository (ReportSink)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two terminals selling the last unit both issue a stock decrement. WAL
//! lets catalog reads proceed during the write; the busy timeout makes the
//! second writer wait for the first instead of failing with `SQLITE_BUSY`,
//! and the compare-and-decrement then reports the conflict.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::transaction::TransactionRepository;

/// Connections kept for a shared store file.
const FILE_POOL_SIZE: u32 = 4;

/// Where the catalog and history live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// A database file, created on first use.
    File(PathBuf),
    /// A private in-memory database.
    Memory,
}

/// How to open the database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub storage: Storage,
    /// How long a write waits for another terminal's lock.
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// The store file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            storage: Storage::File(path.into()),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// A throwaway database for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            storage: Storage::Memory,
            busy_timeout: Duration::from_secs(1),
        }
    }

    fn pool_size(&self) -> u32 {
        match self.storage {
            Storage::File(_) => FILE_POOL_SIZE,
            // Every connection to :memory: is a separate database
            Storage::Memory => 1,
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.storage {
            Storage::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            Storage::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
        };

        // SQLite has them disabled by default
        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }
}

/// Main database handle providing repository access.
///
/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(storage = ?config.storage, "Opening database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size())
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;
        let (total, applied) = migrations::migration_status(&pool).await?;
        debug!(total, applied, connections = config.pool_size(), "Database ready");

        Ok(Database { pool })
    }

    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }
}
