//! Behavior runner subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound query string
//!     → params.rs (flatten into Params, last value wins)
//!     → runner.rs (T recorder handed to one behavior)
//!     → entry.rs (status/output pairs collected per run)
//!     → JSON array back to the orchestrator
//! ```
//!
//! # Design Decisions
//! - A behavior reports outcomes as entries, never as transport errors
//! - `Fatal` is a marker returned through `?` to stop a behavior early
//! - Entries are collected per run; nothing is shared between requests

pub mod entry;
pub mod params;
pub mod runner;

pub use entry::{Entry, Status};
pub use params::{extract_params, Params, BEHAVIOR_PARAM};
pub use runner::{run, Fatal, T};
