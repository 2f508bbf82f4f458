//! Core module containing shared infrastructure components.
//!
//! Configuration, error handling, the failure log, identifier safety, the
//! server that owns the tool components, and the transports exposing it.

pub mod config;
pub mod error;
pub mod failure_log;
pub mod security;
pub mod server;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use failure_log::FailureLog;
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
