//! # Customer Display
//!
//! The customer-facing display is a read-only mirror of the active cart.
//! The session publishes a [`DisplayFrame`] after every mutation; the
//! display never writes back.
//!
//! ```text
//! ┌────────────────────────────┐        ┌─────────────────────────────────┐
//! │  TerminalSession           │        │  Customer display               │
//! │                            │ frame  │                                 │
//! │  add / qty / rm / pay ─────┼───────►│  Active: lines + totals         │
//! │                            │        │  Idle:   "Welcome to Our Store!"│
//! └────────────────────────────┘        │          (rotates per frame)    │
//!                                       └─────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use tally_core::{Currency, DisplayFrame, DisplaySink};
use tracing::{debug, info};

/// Cycles through the idle messages, one step per idle frame.
#[derive(Debug, Default)]
pub struct IdleRotation {
    messages: Vec<String>,
    index: AtomicUsize,
}

impl IdleRotation {
    pub fn new(messages: Vec<String>) -> Self {
        IdleRotation {
            messages,
            index: AtomicUsize::new(0),
        }
    }

    /// The message currently shown, if any are configured.
    pub fn current(&self) -> Option<&str> {
        if self.messages.is_empty() {
            return None;
        }
        let i = self.index.load(Ordering::Relaxed) % self.messages.len();
        Some(self.messages[i].as_str())
    }

    /// Returns the current message and moves to the next one.
    pub fn advance(&self) -> Option<&str> {
        if self.messages.is_empty() {
            return None;
        }
        let i = self.index.fetch_add(1, Ordering::Relaxed) % self.messages.len();
        Some(self.messages[i].as_str())
    }
}

/// A display that writes frames to the log.
///
/// Stands in for a second screen: each frame becomes one `info!` event,
/// and the full frame is available as JSON at `debug` level.
#[derive(Debug)]
pub struct TracingDisplay {
    currency: Currency,
    idle: IdleRotation,
}

impl TracingDisplay {
    pub fn new(currency: Currency, idle: IdleRotation) -> Self {
        TracingDisplay { currency, idle }
    }
}

impl DisplaySink for TracingDisplay {
    fn publish(&self, frame: &DisplayFrame) {
        match frame {
            DisplayFrame::Idle => {
                let idle_message = self.idle.advance().unwrap_or_default();
                info!(target: "tally::display", idle_message, "Display idle");
            }
            DisplayFrame::Active { lines, totals } => {
                info!(
                    target: "tally::display",
                    lines = lines.len(),
                    subtotal = %self.currency.format(totals.subtotal),
                    tax = %self.currency.format(totals.tax),
                    total = %self.currency.format(totals.total),
                    "Display updated"
                );
            }
        }

        if let Ok(json) = serde_json::to_string(frame) {
            debug!(target: "tally::display", frame = %json);
        }
    }
}
