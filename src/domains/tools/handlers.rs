//! Tool handlers.
//!
//! A handler is the invocable half of a loaded tool. Artifacts stored on disk
//! become [`ScriptHandler`]s, which run the artifact body as an external
//! program once per call. Anything else that implements [`ToolHandler`] can be
//! registered the same way.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::error::ToolError;

/// Prefix of the environment variables carrying scalar arguments.
pub const ARG_ENV_PREFIX: &str = "TOOL_ARG_";

/// Trait for implementing tool handlers.
///
/// Implementations receive arguments that already passed schema validation.
/// Returning `Err` marks the call as a handler failure; the invocation path
/// turns it into an error result for the caller.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with the given arguments.
    async fn call(
        &self,
        tool_id: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError>;
}

/// Handler that runs an artifact body through an external program.
///
/// The body is appended as the last argument of the command line, the
/// arguments are written to stdin as one JSON object and scalar arguments are
/// also exported as `TOOL_ARG_<name>`.
#[derive(Debug, Clone)]
pub struct ScriptHandler {
    program: String,
    args: Vec<String>,
    body: String,
    working_dir: PathBuf,
}

impl ScriptHandler {
    /// Create a handler from a command line (program first) and a body.
    ///
    /// Returns `None` when the command line is empty.
    pub fn new(command: &[String], body: impl Into<String>, working_dir: PathBuf) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            body: body.into(),
            working_dir,
        })
    }
}

#[async_trait]
impl ToolHandler for ScriptHandler {
    #[instrument(skip(self, arguments), fields(program = %self.program))]
    async fn call(
        &self,
        tool_id: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&self.body)
            .current_dir(&self.working_dir)
            .env("TOOL_ID", tool_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (name, value) in &arguments {
            if let Some(text) = scalar_env_value(value) {
                if is_env_safe(name) {
                    command.env(format!("{ARG_ENV_PREFIX}{name}"), text);
                }
            }
        }

        let payload = serde_json::to_vec(&Value::Object(arguments))
            .map_err(|e| ToolError::handler_failure(format!("cannot encode arguments: {e}")))?;

        let mut child = command.spawn().map_err(|e| {
            ToolError::handler_failure(format!("failed to start '{}': {}", self.program, e))
        })?;

        // Feed stdin while the child runs so a chatty script can't fill its
        // stdout pipe and stall on a full stdin.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&payload).await {
                    debug!("Tool did not consume its input: {}", e);
                }
            }
        };
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output
            .map_err(|e| ToolError::handler_failure(format!("failed to wait for tool: {e}")))?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Ok(CallToolResult::success(vec![Content::text(
                stdout.trim_end().to_string(),
            )]));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            Err(ToolError::handler_failure(format!(
                "tool exited with {}",
                output.status
            )))
        } else {
            Err(ToolError::handler_failure(stderr.to_string()))
        }
    }
}

fn scalar_env_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_env_safe(name: &str) -> bool {
    !name.is_empty() && !name.contains(['=', '\0'])
}
