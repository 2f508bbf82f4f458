//! HTTP transport implementation.
//!
//! One listener serves three surfaces:
//! - MCP over SSE: `GET /mcp/sse` opens a session, `POST /messages` feeds it
//! - stateless JSON-RPC: `POST /mcp` answers in the HTTP response
//! - the tool management API under `/api/tool`

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::management;
use super::rpc::{self, JsonRpcRequest};
use super::sse::{self, SessionTransportManager};
use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The MCP server instance.
    pub(crate) server: McpServer,
    /// Open SSE sessions.
    pub(crate) sessions: Arc<SessionTransportManager>,
    /// Mounted paths, advertised by the root and `endpoint` events.
    pub(crate) config: Arc<HttpConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the HTTP transport.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = router(server, &self.config);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!("Ready - listening on {} (CORS {})", addr, cors_status);
        info!("  → SSE session: GET  {}", self.config.sse_path);
        info!("  → Messages:    POST {}?sessionId=<id>", self.config.message_path);
        info!("  → JSON-RPC:    POST {}", self.config.rpc_path);
        info!("  → Tools API:   {}/*", self.config.api_prefix);
        info!("  → Health:      GET  /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Build the full HTTP application.
pub fn router(server: McpServer, config: &HttpConfig) -> Router {
    let state = AppState {
        server,
        sessions: Arc::new(SessionTransportManager::new()),
        config: Arc::new(config.clone()),
    };

    let mut app = Router::new()
        .route(&config.rpc_path, post(handle_rpc))
        .route(&config.sse_path, get(sse::handle_sse))
        .route(&config.message_path, post(sse::handle_message))
        .nest(&config.api_prefix, management::routes())
        .route("/health", get(health_check))
        .route("/", get(root_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let paths = &state.config;
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "endpoints": {
            "sse": paths.sse_path,
            "messages": paths.message_path,
            "rpc": paths.rpc_path,
            "tools": paths.api_prefix,
            "health": "/health"
        },
        "protocol": "JSON-RPC 2.0",
        "protocolVersion": rpc::PROTOCOL_VERSION
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "tools": state.server.registry().len(),
        "sessions": state.sessions.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle stateless JSON-RPC requests.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(State(state): State<AppState>, Json(request): Json<JsonRpcRequest>) -> Response {
    tracing::Span::current().record("method", &request.method);
    info!("Received JSON-RPC request: {}", request.method);

    match rpc::dispatch(&state.server, request).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
