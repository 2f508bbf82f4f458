//! Transport layer for the MCP server.
//!
//! This module provides two transport implementations:
//! - **HTTP**: SSE sessions, stateless JSON-RPC and the tool management API
//! - **STDIO**: Standard input/output, protocol path only - feature: `stdio`
//!
//! Both hand protocol messages to the same `McpServer`, so they observe the
//! same tool registry.

mod config;
mod error;
mod service;

pub mod http;
pub mod management;
pub mod rpc;
pub mod sse;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::{DEFAULT_PORT, HttpConfig, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use service::TransportService;
pub use sse::SessionTransportManager;
