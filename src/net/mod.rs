//! Network layer.
//!
//! # Data Flow
//! ```text
//! host:port from config
//!     → listener.rs (normalize, bind, report bound address)
//!     → Client / Server accept loops
//! ```

pub mod listener;

pub use listener::{bind, normalize_host_port, ListenerError};
