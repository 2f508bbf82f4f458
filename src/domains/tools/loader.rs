//! Tool Loader - turns stored artifacts into registered tools.
//!
//! Loading is isolated per identifier: a broken artifact is logged and left
//! out of the registry, and never stops other tools from loading. The loader
//! owns the per-identifier locks, so startup loading and management writes on
//! the same tool never interleave.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use super::error::ToolError;
use super::handlers::ScriptHandler;
use super::locks::{KeyGuard, KeyedLocks};
use super::manifest::ToolManifest;
use super::registry::{LoadedTool, ToolRegistry};
use super::store::ToolCodeStore;
use crate::core::failure_log::FailureLog;

/// Outcome of a full loading pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<String>,
}

/// Loads artifacts from a [`ToolCodeStore`] into a [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolLoader {
    store: Arc<ToolCodeStore>,
    registry: Arc<ToolRegistry>,
    failures: FailureLog,
    default_command: Vec<String>,
    locks: KeyedLocks,
}

impl ToolLoader {
    pub fn new(
        store: Arc<ToolCodeStore>,
        registry: Arc<ToolRegistry>,
        failures: FailureLog,
        default_command: Vec<String>,
    ) -> Self {
        Self {
            store,
            registry,
            failures,
            default_command,
            locks: KeyedLocks::new(),
        }
    }

    /// Take the lock serializing all work on `id`.
    pub async fn lock(&self, id: &str) -> KeyGuard {
        self.locks.lock(id).await
    }

    /// Load every stored artifact.
    ///
    /// Each identifier is loaded independently. Failing to list the store is
    /// logged to the global bucket and yields an empty report.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> LoadReport {
        let ids = match self.store.list().await {
            Ok(ids) => ids,
            Err(e) => {
                self.failures
                    .record(crate::core::failure_log::GLOBAL_BUCKET, format!("{e:?}"))
                    .await;
                return LoadReport::default();
            }
        };

        let outcomes = join_all(ids.iter().map(|id| self.reload(id))).await;

        let mut report = LoadReport::default();
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(_) => report.loaded.push(id),
                Err(_) => report.failed.push(id),
            }
        }

        info!(
            "Loaded {} tool(s), {} failed",
            report.loaded.len(),
            report.failed.len()
        );
        report
    }

    /// (Re)load one tool from the store and register it.
    ///
    /// On failure the identifier is also removed from the registry, so a
    /// stale version is never served after its artifact changed.
    pub async fn reload(&self, id: &str) -> Result<Arc<LoadedTool>, ToolError> {
        let guard = self.lock(id).await;
        self.reload_locked(&guard).await
    }

    /// [`reload`](Self::reload) for a caller already holding the tool's lock.
    #[instrument(skip_all, fields(id = guard.key()))]
    pub async fn reload_locked(&self, guard: &KeyGuard) -> Result<Arc<LoadedTool>, ToolError> {
        let id = guard.key();
        match self.build(id).await {
            Ok(tool) => {
                self.registry.register(tool);
                self.registry
                    .get(id)
                    .ok_or_else(|| ToolError::load_failure(id, "tool vanished during registration"))
            }
            Err(e) => {
                warn!("Rejected tool {}: {}", id, e);
                if !matches!(e, ToolError::NotFound(_)) {
                    self.failures.record(id, format!("{e:?}")).await;
                }
                self.registry.unregister(id);
                Err(e)
            }
        }
    }

    /// Drop a tool from the registry.
    pub async fn unload(&self, id: &str) {
        let guard = self.lock(id).await;
        self.unload_locked(&guard);
    }

    /// [`unload`](Self::unload) for a caller already holding the tool's lock.
    pub fn unload_locked(&self, guard: &KeyGuard) {
        self.registry.unregister(guard.key());
    }

    #[cfg(test)]
    pub(crate) fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    async fn build(&self, id: &str) -> Result<LoadedTool, ToolError> {
        let source = self.store.get(id).await?;
        let manifest = ToolManifest::parse(id, &source)?;

        let command = manifest.command.as_deref().unwrap_or(&self.default_command);
        let handler = ScriptHandler::new(command, manifest.body, self.store.dir_of(id)?)
            .ok_or_else(|| ToolError::load_failure(id, "no command configured to run the tool"))?;

        Ok(LoadedTool::new(
            id,
            manifest.description,
            manifest.schema,
            Arc::new(handler),
        ))
    }
}
