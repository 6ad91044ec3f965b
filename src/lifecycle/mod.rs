//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Start server → Bind client → Serve client
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Client and server loops stop accepting → Exit
//!
//! Signals (signals.rs):
//!     SIGINT (Ctrl-C) → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: server first, then client
//! - A shutdown triggered before a loop starts still stops it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
