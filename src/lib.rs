//! Crossdock interoperability harness for a distributed tracing client.

pub mod client;
pub mod config;
pub mod crossdock;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod tracer;
pub mod transport;

pub use client::Client;
pub use config::CrossdockConfig;
pub use lifecycle::Shutdown;
pub use server::Server;
