//! # Tally Terminal Library
//!
//! The operator terminal: configuration, the per-operator session, the
//! customer display and the command parser. `main.rs` wires these to the
//! SQLite database and runs the prompt.
//!
//! ## Module Organization
//! ```text
//! tally_terminal/
//! ├── lib.rs          ◄─── You are here
//! ├── config.rs       ◄─── ConfigState (TALLY_* env over defaults)
//! ├── session.rs      ◄─── TerminalSession (cart, picker, checkout)
//! ├── display.rs      ◄─── TracingDisplay, IdleRotation
//! ├── commands.rs     ◄─── Operator command parser
//! └── error.rs        ◄─── TerminalError { code, message }
//! ```
//!
//! ## Shared State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐   │
//! │  │ TerminalSession  │ │ SuspensionStore  │ │    ConfigState       │   │
//! │  │                  │ │                  │ │                      │   │
//! │  │  • Active cart   │ │  • Pending carts │ │  • Tax rate          │   │
//! │  │  • Picker state  │ │  • Shared by all │ │  • Currency          │   │
//! │  │  • &mut, 1 user  │ │    sessions      │ │  • Operator id       │   │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod session;

pub use commands::Command;
pub use config::ConfigState;
pub use display::{IdleRotation, TracingDisplay};
pub use error::{ErrorCode, TerminalError, TerminalResult};
pub use session::{SelectionStatus, TerminalSession};
