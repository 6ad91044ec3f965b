//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI overrides (main.rs), validated again
//!     → with_defaults() fills blank addresses
//!     → handed by value to Client / Server at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a Client or Server is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::CrossdockConfig;
pub use schema::ServerConfig;
pub use schema::TimeoutConfig;
pub use validation::{validate_config, ValidationError};
