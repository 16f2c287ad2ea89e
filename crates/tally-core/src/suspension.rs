//! # Order Suspension Store
//!
//! Parked carts, keyed by id, shared between terminal sessions.
//!
//! ## Thread Safety
//! The store is an `Arc<Mutex<..>>` handle: cloning it shares the same
//! orders. `resume` checks and removes under one lock acquisition, so two
//! sessions racing for the same order cannot both get it.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active cart ──pend(snapshot)──► [ id₁ | id₂ | id₃ ]  (oldest first)   │
//! │                                        │                                │
//! │                        resume(id₂) ────┘ removed, lines returned        │
//! │                                                                         │
//! │  resume(id₂) again ──► NotFound                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartSnapshot;
use crate::error::{EngineError, EngineResult};

/// A parked order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: String,
    pub snapshot: CartSnapshot,
    pub created_at: DateTime<Utc>,
    /// Free-form note, e.g. the customer's name.
    pub note: Option<String>,
}

/// Listing entry; carries counts instead of full line detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub line_count: usize,
    pub total_quantity: i64,
    pub note: Option<String>,
}

impl From<&PendingOrder> for PendingSummary {
    fn from(order: &PendingOrder) -> Self {
        PendingSummary {
            id: order.id.clone(),
            created_at: order.created_at,
            line_count: order.snapshot.line_count(),
            total_quantity: order.snapshot.total_quantity(),
            note: order.note.clone(),
        }
    }
}

/// Shared store of suspended orders, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SuspensionStore {
    orders: Arc<Mutex<Vec<PendingOrder>>>,
}

impl SuspensionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingOrder>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parks a cart snapshot and returns its new id.
    ///
    /// ## Errors
    /// `EmptyCart` if the snapshot has no lines.
    pub fn pend(&self, snapshot: CartSnapshot, note: Option<String>) -> EngineResult<String> {
        if snapshot.is_empty() {
            return Err(EngineError::EmptyCart);
        }

        let id = Uuid::new_v4().to_string();
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        self.lock().push(PendingOrder {
            id: id.clone(),
            snapshot,
            created_at: Utc::now(),
            note,
        });

        Ok(id)
    }

    /// All parked orders, oldest first.
    pub fn list(&self) -> Vec<PendingSummary> {
        self.lock().iter().map(PendingSummary::from).collect()
    }

    /// Removes an order and returns its lines.
    ///
    /// ## Errors
    /// `NotFound` if no order has this id, including one already resumed.
    pub fn resume(&self, id: &str) -> EngineResult<CartSnapshot> {
        let mut orders = self.lock();
        let position = orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        Ok(orders.remove(position).snapshot)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
