//! Execution Gateway - request/response façade over the tool store and registry.
//!
//! Used by management clients for CRUD and direct execution. Every mutating
//! operation runs the store write and the reload as one spawned task holding
//! the tool's lock. Dropping the caller's future does not stop that task, so
//! disk and registry never disagree, and a successful create or update is
//! visible to the next invocation.

use std::future::Future;
use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde_json::Value;
use tracing::{instrument, warn};

use super::error::ToolError;
use super::invoke::invoke_tool;
use super::loader::ToolLoader;
use super::registry::ToolRegistry;
use super::store::ToolCodeStore;
use crate::core::failure_log::FailureLog;

/// Outcome of a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTool {
    pub code: String,
    /// Set when the artifact was stored but could not be loaded.
    pub load_error: Option<String>,
}

/// Synchronous façade for management clients.
pub struct ExecutionGateway {
    store: Arc<ToolCodeStore>,
    registry: Arc<ToolRegistry>,
    loader: ToolLoader,
    failures: FailureLog,
}

impl ExecutionGateway {
    pub fn new(
        store: Arc<ToolCodeStore>,
        registry: Arc<ToolRegistry>,
        loader: ToolLoader,
        failures: FailureLog,
    ) -> Self {
        Self {
            store,
            registry,
            loader,
            failures,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Store a new artifact (replacing any previous one) and load it.
    #[instrument(skip(self, code))]
    pub async fn create_tool(&self, id: &str, code: &str) -> Result<StoredTool, ToolError> {
        let (store, loader) = (self.store.clone(), self.loader.clone());
        let (key, code) = (id.to_string(), code.to_string());
        detached(id, async move {
            let guard = loader.lock(&key).await;
            let code = store.create(&key, &code).await?;
            let load_error = loader.reload_locked(&guard).await.err().map(|e| e.to_string());
            Ok(StoredTool { code, load_error })
        })
        .await
    }

    /// Replace an existing artifact and reload it.
    #[instrument(skip(self, code))]
    pub async fn update_tool(&self, id: &str, code: &str) -> Result<StoredTool, ToolError> {
        let (store, loader) = (self.store.clone(), self.loader.clone());
        let (key, code) = (id.to_string(), code.to_string());
        detached(id, async move {
            let guard = loader.lock(&key).await;
            store.update(&key, &code).await?;
            let load_error = loader.reload_locked(&guard).await.err().map(|e| e.to_string());
            Ok(StoredTool { code, load_error })
        })
        .await
    }

    /// Remove an artifact and its registry entry.
    #[instrument(skip(self))]
    pub async fn delete_tool(&self, id: &str) -> Result<(), ToolError> {
        let (store, loader) = (self.store.clone(), self.loader.clone());
        let key = id.to_string();
        detached(id, async move {
            let guard = loader.lock(&key).await;
            store.delete(&key).await?;
            loader.unload_locked(&guard);
            Ok(())
        })
        .await
    }

    pub async fn get_tool(&self, id: &str) -> Result<String, ToolError> {
        self.store.get(id).await
    }

    pub async fn export_tool(&self, id: &str) -> Result<String, ToolError> {
        self.store.export(id).await
    }

    /// Run a tool and hand its result straight back.
    pub async fn execute(&self, id: &str, input: Value) -> Result<CallToolResult, ToolError> {
        invoke_tool(&self.registry, &self.failures, id, input).await
    }
}

/// Run a mutation to completion even if the caller stops waiting for it.
async fn detached<T, F>(id: &str, task: F) -> Result<T, ToolError>
where
    F: Future<Output = Result<T, ToolError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(task).await.map_err(|e| {
        warn!("Mutation of {} did not complete: {}", id, e);
        ToolError::storage(id, std::io::Error::other(e.to_string()))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const ADD_TWO: &str = "---\ndescription: Adds a and b\nparams:\n  a: number\n  b: number\n---\necho $((TOOL_ARG_a + TOOL_ARG_b))\n";

    fn gateway(dir: &TempDir) -> ExecutionGateway {
        let failures = FailureLog::new(dir.path().join("logs"));
        let store = Arc::new(ToolCodeStore::new(dir.path().join("tools"), failures.clone()));
        let registry = Arc::new(ToolRegistry::new());
        let loader = ToolLoader::new(
            store.clone(),
            registry.clone(),
            failures.clone(),
            vec!["sh".to_string(), "-c".to_string()],
        );
        ExecutionGateway::new(store, registry, loader, failures)
    }

    fn text_of(result: &CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    #[tokio::test]
    async fn test_add_two_lifecycle() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);

        let stored = gateway.create_tool("addTwo", ADD_TWO).await.unwrap();
        assert_eq!(stored.code, ADD_TWO);
        assert_eq!(stored.load_error, None);

        let result = gateway
            .execute("addTwo", json!({ "a": 2, "b": 3 }))
            .await
            .unwrap();
        assert_eq!(text_of(&result), "5");

        gateway.delete_tool("addTwo").await.unwrap();
        let err = gateway
            .execute("addTwo", json!({ "a": 2, "b": 3 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_update_is_read_your_write() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);

        gateway.create_tool("greet", "echo hello").await.unwrap();
        gateway.update_tool("greet", "echo goodbye").await.unwrap();

        let result = gateway.execute("greet", Value::Null).await.unwrap();
        assert_eq!(text_of(&result), "goodbye");
        assert_eq!(gateway.get_tool("greet").await.unwrap(), "echo goodbye");
    }

    #[tokio::test]
    async fn test_update_missing_tool_fails() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);

        let err = gateway.update_tool("ghost", "echo x").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(!gateway.registry().contains("ghost"));
    }

    #[tokio::test]
    async fn test_create_reports_load_error_but_keeps_artifact() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);

        let stored = gateway.create_tool("blank", "   \n").await.unwrap();
        assert!(stored.load_error.unwrap().contains("no handler body"));
        assert_eq!(gateway.export_tool("blank").await.unwrap(), "   \n");
        assert!(!gateway.registry().contains("blank"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_name_field() {
        let dir = TempDir::new().unwrap();
        let gateway = gateway(&dir);
        gateway.create_tool("addTwo", ADD_TWO).await.unwrap();

        let err = gateway
            .execute("addTwo", json!({ "a": 2 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref field, .. } if field == "b"));
    }

    #[tokio::test]
    async fn test_concurrent_writers_serialize_per_tool() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(gateway(&dir));

        let writers = (0..8).map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway
                    .create_tool("racy", &format!("echo {i}"))
                    .await
                    .unwrap();
            })
        });
        for writer in writers {
            writer.await.unwrap();
        }

        // Whichever writer went last, disk and registry agree.
        let code = gateway.get_tool("racy").await.unwrap();
        let result = gateway.execute("racy", Value::Null).await.unwrap();
        assert_eq!(format!("echo {}", text_of(&result)), code);
        assert_eq!(gateway.loader.locks().held(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_create_keeps_disk_and_registry_in_step() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(gateway(&dir));
        gateway.create_tool("flip", "echo v0").await.unwrap();

        for i in 0..24 {
            let writer = {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.create_tool("flip", &format!("echo v{i}")).await })
            };
            for _ in 0..i {
                tokio::task::yield_now().await;
            }
            writer.abort();
            let _ = writer.await;

            // Any write still in flight finishes before the lock is granted.
            let _guard = gateway.loader.lock("flip").await;
            let code = gateway.get_tool("flip").await.unwrap();
            let result = gateway.execute("flip", Value::Null).await.unwrap();
            assert_eq!(format!("echo {}", text_of(&result)), code, "after abort #{i}");
        }
    }
}
