//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Engine Seams                        │
//! │                                                                         │
//! │  tally-core trait          Repository               Tables              │
//! │  ────────────────          ──────────               ──────              │
//! │  CatalogStore      ◄────── CatalogRepository ─────► products            │
//! │                                                     product_variants    │
//! │  ReportSink        ◄────── TransactionRepository ─► transactions        │
//! │                                                                         │
//! │  The engine only ever sees the traits; SQL stays in this module.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`] - Products, variants, atomic stock decrement
//! - [`TransactionRepository`] - Append-only sales history

pub mod catalog;
pub mod transaction;

pub use catalog::CatalogRepository;
pub use transaction::TransactionRepository;
