//! Streaming MCP sessions over Server-Sent Events.
//!
//! A client opens `GET /mcp/sse` and receives an `endpoint` event naming the
//! URL it must POST its JSON-RPC messages to. Responses are pushed back on the
//! event stream as `message` events. The session lives exactly as long as the
//! event stream.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::http::AppState;
use super::rpc::{self, JsonRpcRequest, JsonRpcResponse};
use super::{TransportError, TransportResult};
use crate::core::McpServer;

/// Open sessions, keyed by session id.
#[derive(Default)]
pub struct SessionTransportManager {
    sessions: RwLock<HashMap<String, UnboundedSender<JsonRpcResponse>>>,
}

impl SessionTransportManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and return its id with the receiving half of
    /// its outbound channel.
    pub fn open_session(&self) -> (String, UnboundedReceiver<JsonRpcResponse>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().insert(id.clone(), tx);
        info!(session = %id, "Session opened");
        (id, rx)
    }

    /// Hand a message to an open session.
    ///
    /// The request is processed on its own task; its response, if any, is
    /// pushed to the session's stream. Fails only when the session is not open.
    pub fn route(
        &self,
        server: &McpServer,
        session_id: &str,
        request: JsonRpcRequest,
    ) -> TransportResult<()> {
        let tx = self
            .sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TransportError::unknown_session(session_id))?;

        let server = server.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            let Some(response) = rpc::dispatch(&server, request).await else {
                return;
            };
            if tx.send(response).is_err() {
                debug!(session = %session_id, "Session closed before response was delivered");
            }
        });
        Ok(())
    }

    /// Remove a session. Unknown or already closed ids are ignored.
    pub fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id).is_some();
        if removed {
            info!(session = %session_id, "Session closed");
        }
        removed
    }

    pub fn is_open(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Closes its session when dropped, i.e. when the event stream goes away.
struct SessionGuard {
    manager: Arc<SessionTransportManager>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.close_session(&self.id);
    }
}

fn message_event(response: &JsonRpcResponse) -> Option<Event> {
    match serde_json::to_string(response) {
        Ok(data) => Some(Event::default().event("message").data(data)),
        Err(e) => {
            warn!("Dropping unserializable response: {}", e);
            None
        }
    }
}

/// `GET /mcp/sse`: open a session and stream its responses.
pub async fn handle_sse(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.sessions.open_session();
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", state.config.message_path, id));

    let guard = SessionGuard {
        manager: state.sessions.clone(),
        id,
    };

    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            let response = rx.recv().await?;
            if let Some(event) = message_event(&response) {
                return Some((event, (rx, guard)));
            }
        }
    });

    let events = stream::once(async move { endpoint })
        .chain(messages)
        .map(Ok::<_, Infallible>);

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Query string of the message endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// `POST /messages?sessionId=<id>`: route one JSON-RPC message to a session.
pub async fn handle_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| state.sessions.is_open(id)) else {
        warn!("Message posted to an unknown session");
        return no_transport();
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(session = %session_id, "Invalid JSON-RPC message: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid message: {e}")).into_response();
        }
    };

    debug!(session = %session_id, method = %request.method, "Routing message");
    match state.sessions.route(&state.server, &session_id, request) {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        // Closed between the lookup and the route.
        Err(_) => no_transport(),
    }
}

fn no_transport() -> Response {
    (StatusCode::BAD_REQUEST, "No transport found for sessionId").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use serde_json::json;
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> McpServer {
        let mut config = Config::default();
        config.tools.tools_dir = dir.path().join("tools");
        config.tools.logs_dir = dir.path().join("logs");
        McpServer::new(config)
    }

    fn ping(id: i64) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: "ping".to_string(),
            params: None,
        }
    }

    #[tokio::test]
    async fn test_routed_message_answers_on_session_stream() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let manager = SessionTransportManager::new();

        let (id, mut rx) = manager.open_session();
        manager.route(&server, &id, ping(7)).unwrap();

        let response = rx.recv().await.unwrap();
        assert_eq!(response.id, Some(json!(7)));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let manager = SessionTransportManager::new();
        let (id, _rx) = manager.open_session();

        let err = manager.route(&server, "never-issued", ping(1)).unwrap_err();
        assert!(matches!(err, TransportError::UnknownSession(_)));
        assert!(manager.is_open(&id));
    }

    #[tokio::test]
    async fn test_closed_session_is_unknown() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let manager = SessionTransportManager::new();

        let (id, _rx) = manager.open_session();
        assert!(manager.close_session(&id));
        let err = manager.route(&server, &id, ping(1)).unwrap_err();
        assert!(matches!(err, TransportError::UnknownSession(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let manager = SessionTransportManager::new();
        let (id, _rx) = manager.open_session();
        assert!(manager.close_session(&id));
        assert!(!manager.close_session(&id));
        assert!(!manager.close_session("unknown"));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_guard_closes_session() {
        let manager = Arc::new(SessionTransportManager::new());
        let (id, _rx) = manager.open_session();
        let guard = SessionGuard {
            manager: manager.clone(),
            id: id.clone(),
        };
        assert_eq!(manager.len(), 1);
        drop(guard);
        assert!(!manager.is_open(&id));
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let manager = SessionTransportManager::new();
        let (a, _ra) = manager.open_session();
        let (b, _rb) = manager.open_session();
        assert_ne!(a, b);
        assert_eq!(manager.len(), 2);
    }
}
