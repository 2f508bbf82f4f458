//! The invocation path shared by protocol sessions and direct execution.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use rmcp::model::{CallToolResult, Content};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::error::ToolError;
use super::registry::ToolRegistry;
use crate::core::failure_log::FailureLog;

/// Look up, validate and run a tool.
///
/// Lookup and validation failures are returned as `Err` and the handler is
/// not called. Anything that goes wrong inside the handler, including a
/// panic, is logged and comes back as an `Ok` result with `is_error` set.
#[instrument(skip(registry, failures, arguments))]
pub async fn invoke_tool(
    registry: &ToolRegistry,
    failures: &FailureLog,
    id: &str,
    arguments: Value,
) -> Result<CallToolResult, ToolError> {
    let tool = registry.get(id).ok_or_else(|| {
        warn!("Unknown tool requested: {}", id);
        ToolError::unknown_tool(id)
    })?;

    let arguments = tool.schema.validate(arguments).inspect_err(|e| {
        warn!("Rejected arguments for {}: {}", id, e);
    })?;

    info!("Invoking tool: {}", id);
    let outcome = AssertUnwindSafe(tool.handler.call(&tool.id, arguments))
        .catch_unwind()
        .await;

    let failure = match outcome {
        Ok(Ok(result)) => return Ok(result),
        Ok(Err(e)) => e,
        Err(panic) => ToolError::handler_failure(panic_message(panic.as_ref())),
    };

    failures.record(id, format!("{failure:?}")).await;
    Ok(CallToolResult::error(vec![Content::text(failure.to_string())]))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("tool panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("tool panicked: {msg}")
    } else {
        "tool panicked".to_string()
    }
}
