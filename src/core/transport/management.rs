//! Tool management API.
//!
//! CRUD and direct execution over HTTP, mounted under `/api/tool`. Every
//! route answers with a well-formed JSON payload, failures included.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::http::AppState;
use crate::domains::tools::{EXPORT_EXTENSION, StoredTool, ToolError};

/// Body of create and update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSource {
    pub tool_id: String,
    pub code: String,
}

/// Body of delete.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRef {
    pub tool_id: String,
}

/// Body of execute.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteBody {
    #[serde(default)]
    pub input: Value,
}

/// Standard management payload.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
}

impl ToolResponse {
    fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    fn stored(stored: StoredTool, include_code: bool) -> Self {
        Self {
            success: true,
            code: include_code.then_some(stored.code),
            load_error: stored.load_error,
            ..Default::default()
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

impl IntoResponse for ToolResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Routes, relative to the API prefix.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_tool))
        .route("/update", post(update_tool))
        .route("/delete", post(delete_tool))
        .route("/get/{tool_id}", get(get_tool))
        .route("/export/{tool_id}", get(export_tool))
        .route("/execute/{tool_id}", post(execute_tool))
        .route("/list", get(list_tools))
}

fn bad_body(rejection: JsonRejection) -> Response {
    warn!("Rejected management request body: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        ToolResponse::failed(rejection.body_text()),
    )
        .into_response()
}

#[instrument(skip_all)]
async fn create_tool(
    State(state): State<AppState>,
    body: Result<Json<ToolSource>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    info!(tool = %body.tool_id, "Creating tool");

    match state.server.gateway().create_tool(&body.tool_id, &body.code).await {
        Ok(stored) => ToolResponse::stored(stored, true).into_response(),
        Err(e) => ToolResponse::failed(e).into_response(),
    }
}

#[instrument(skip_all)]
async fn update_tool(
    State(state): State<AppState>,
    body: Result<Json<ToolSource>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    info!(tool = %body.tool_id, "Updating tool");

    match state.server.gateway().update_tool(&body.tool_id, &body.code).await {
        Ok(stored) => ToolResponse::stored(stored, false).into_response(),
        Err(e) => ToolResponse::failed(e).into_response(),
    }
}

#[instrument(skip_all)]
async fn delete_tool(
    State(state): State<AppState>,
    body: Result<Json<ToolRef>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };
    info!(tool = %body.tool_id, "Deleting tool");

    match state.server.gateway().delete_tool(&body.tool_id).await {
        Ok(()) => ToolResponse::ok().into_response(),
        Err(e) => ToolResponse::failed(e).into_response(),
    }
}

async fn get_tool(State(state): State<AppState>, Path(tool_id): Path<String>) -> ToolResponse {
    match state.server.gateway().get_tool(&tool_id).await {
        Ok(code) => ToolResponse {
            success: true,
            code: Some(code),
            ..Default::default()
        },
        Err(e) => ToolResponse::failed(e),
    }
}

async fn export_tool(State(state): State<AppState>, Path(tool_id): Path<String>) -> Response {
    match state.server.gateway().export_tool(&tool_id).await {
        Ok(code) => {
            let disposition = format!("attachment; filename=\"{tool_id}.{EXPORT_EXTENSION}\"");
            (
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                code,
            )
                .into_response()
        }
        Err(e) => {
            let status = match &e {
                ToolError::NotFound(_) => StatusCode::NOT_FOUND,
                ToolError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, ToolResponse::failed(e)).into_response()
        }
    }
}

#[instrument(skip_all, fields(tool = %tool_id))]
async fn execute_tool(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
    body: Result<Json<ExecuteBody>, JsonRejection>,
) -> Response {
    let input = match body {
        Ok(Json(body)) => body.input,
        // No body at all runs the tool without input.
        Err(JsonRejection::MissingJsonContentType(_)) => Value::Null,
        Err(rejection) => {
            warn!("Rejected execute body: {}", rejection);
            let result = CallToolResult::error(vec![Content::text(rejection.body_text())]);
            return (StatusCode::BAD_REQUEST, Json(result)).into_response();
        }
    };

    let result = match state.server.gateway().execute(&tool_id, input).await {
        Ok(result) => result,
        Err(e) => {
            info!("Execution refused: {}", e);
            CallToolResult::error(vec![Content::text(e.to_string())])
        }
    };
    Json(result).into_response()
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "tools": state.server.list_tools(),
    }))
}
