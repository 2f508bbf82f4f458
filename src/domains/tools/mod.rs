//! Tools domain module.
//!
//! This module handles everything about runtime-defined tools: how their
//! artifacts are stored, loaded, registered and invoked.
//!
//! ## Architecture
//!
//! - `store.rs` - Durable artifact storage (one directory per tool)
//! - `manifest.rs` - Artifact parsing (front matter + handler body)
//! - `schema.rs` - Parameter schemas and argument validation
//! - `handlers.rs` - The `ToolHandler` trait and the script handler
//! - `loader.rs` - Store → registry loading, isolated per tool
//! - `locks.rs` - Per-identifier locks shared by loading and writes
//! - `registry.rs` - In-memory index of invocable tools
//! - `invoke.rs` - Lookup, validation and failure capture for a call
//! - `gateway.rs` - CRUD + direct execution for management clients
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a Tool
//!
//! POST the artifact to `/api/tool/create`. The tool is callable as soon as
//! the request returns; nothing in this crate changes.

mod error;
pub mod gateway;
pub mod handlers;
mod invoke;
pub mod loader;
pub mod locks;
pub mod manifest;
pub mod registry;
pub mod schema;
pub mod store;

pub use error::ToolError;
pub use gateway::{ExecutionGateway, StoredTool};
pub use handlers::{ScriptHandler, ToolHandler};
pub use invoke::invoke_tool;
pub use loader::{LoadReport, ToolLoader};
pub use locks::{KeyGuard, KeyedLocks};
pub use manifest::ToolManifest;
pub use registry::{LoadedTool, ToolRegistry};
pub use schema::{ParamSpec, ParamType, ToolSchema};
pub use store::{EXPORT_EXTENSION, ToolCodeStore};
