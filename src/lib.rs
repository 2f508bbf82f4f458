//! Dynamic Tool Server
//!
//! An MCP server whose tools are not compiled in: each tool is a small
//! artifact on disk, created, updated and removed at runtime through a
//! management API, and served to MCP clients over SSE sessions, stateless
//! JSON-RPC or stdio.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, the failure log, the server and its transports
//! - **domains::tools**: the tool store, loader, registry, invocation path and
//!   execution gateway
//!
//! # Example
//!
//! ```rust,no_run
//! use dynamic_tool_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config.clone());
//!     server.prepare().await?;
//!     server.spawn_initial_load();
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use crate::core::{Config, Error, McpServer, Result};
