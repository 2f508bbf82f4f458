//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler. It owns the tool store,
//! registry, loader and execution gateway, and exposes the registry through
//! the MCP protocol.
//!
//! ## Tool Architecture
//!
//! Tools are not compiled into the server. Their artifacts live under the
//! configured tools directory and are loaded into the `ToolRegistry` at
//! startup (in the background) and after every create/update through the
//! management API. `list_tools` and `call_tool` always read the registry, so
//! every transport sees the same set of tools.

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::*,
    service::RequestContext,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use super::config::Config;
use super::failure_log::FailureLog;
use crate::domains::tools::{
    ExecutionGateway, LoadReport, ToolCodeStore, ToolError, ToolLoader, ToolRegistry,
    invoke_tool,
};

/// Instructions sent to clients on initialize.
pub const INSTRUCTIONS: &str = "This server exposes tools that are defined at runtime. \
     Call tools/list to discover the current set; it changes as tools are created, \
     updated and deleted.";

/// The main MCP server handler.
///
/// Cheap to clone: every component is shared.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Tools currently invocable.
    registry: Arc<ToolRegistry>,

    /// Durable tool artifacts.
    store: Arc<ToolCodeStore>,

    /// Store → registry loader.
    loader: ToolLoader,

    /// CRUD + direct execution for management clients.
    gateway: Arc<ExecutionGateway>,

    /// Failure records.
    failures: FailureLog,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    ///
    /// Nothing is read from disk yet; see [`prepare`](Self::prepare) and
    /// [`spawn_initial_load`](Self::spawn_initial_load).
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let failures = FailureLog::new(config.tools.logs_dir.clone());
        let store = Arc::new(ToolCodeStore::new(
            config.tools.tools_dir.clone(),
            failures.clone(),
        ));
        let registry = Arc::new(ToolRegistry::new());
        let loader = ToolLoader::new(
            store.clone(),
            registry.clone(),
            failures.clone(),
            config.tools.default_command.clone(),
        );
        let gateway = Arc::new(ExecutionGateway::new(
            store.clone(),
            registry.clone(),
            loader.clone(),
            failures.clone(),
        ));

        Self {
            config,
            registry,
            store,
            loader,
            gateway,
            failures,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn gateway(&self) -> &Arc<ExecutionGateway> {
        &self.gateway
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Create the tools and logs directories if they are missing.
    pub async fn prepare(&self) -> Result<(), ToolError> {
        self.store.ensure_root().await?;
        tokio::fs::create_dir_all(self.failures.dir())
            .await
            .map_err(|e| ToolError::storage("*", e))
    }

    /// Start loading every stored tool in the background.
    ///
    /// There is no readiness barrier: calls made before the task finishes
    /// see `UnknownTool` for tools not loaded yet.
    pub fn spawn_initial_load(&self) -> JoinHandle<LoadReport> {
        let loader = self.loader.clone();
        tokio::spawn(async move { loader.load_all().await })
    }

    /// List all available tools.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.registry.tools()
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, ToolError> {
        invoke_tool(&self.registry, &self.failures, name, arguments).await
    }
}

/// Map a lookup/validation failure to its protocol error.
pub fn to_mcp_error(error: ToolError) -> McpError {
    match &error {
        ToolError::UnknownTool(_) => McpError::invalid_params(error.to_string(), None),
        ToolError::InvalidArguments { field, .. } => McpError::invalid_params(
            error.to_string(),
            Some(serde_json::json!({ "field": field })),
        ),
        _ => McpError::internal_error(error.to_string(), None),
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    #[instrument(skip(self, _context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        info!("Listing tools");
        Ok(ListToolsResult {
            tools: self.list_tools(),
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, _context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        self.call_tool(&request.name, arguments)
            .await
            .map_err(to_mcp_error)
    }
}
