//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs (subscriber, filter, stdout formatting)
//! ```
//!
//! # Design Decisions
//! - Structured fields over interpolated messages
//! - `RUST_LOG` overrides the configured level

pub mod logging;

pub use logging::init_logging;
