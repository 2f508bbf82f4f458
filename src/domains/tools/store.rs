//! Durable storage of tool artifacts.
//!
//! Each tool lives in `<root>/<id>/index.tool`. Writes go to a temporary
//! sibling first and are renamed into place, so a reader sees either the old
//! artifact or the new one. Every failure is recorded in the tool's failure
//! log before it is returned.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::error::ToolError;
use crate::core::failure_log::FailureLog;
use crate::core::security::tool_dir;

/// File name of the artifact inside a tool's directory.
pub const ARTIFACT_FILE: &str = "index.tool";

/// Extension used when an artifact is exported for download.
pub const EXPORT_EXTENSION: &str = "tool";

/// Filesystem-backed store of tool artifacts.
#[derive(Debug, Clone)]
pub struct ToolCodeStore {
    root: PathBuf,
    failures: FailureLog,
}

impl ToolCodeStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, failures: FailureLog) -> Self {
        Self {
            root: root.into(),
            failures,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the root directory exists.
    pub async fn ensure_root(&self) -> Result<(), ToolError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ToolError::storage("*", e))
    }

    /// Directory of the tool `id`.
    pub fn dir_of(&self, id: &str) -> Result<PathBuf, ToolError> {
        Ok(tool_dir(&self.root, id)?)
    }

    /// Write a fresh artifact, replacing any previous version entirely.
    #[instrument(skip(self, code))]
    pub async fn create(&self, id: &str, code: &str) -> Result<String, ToolError> {
        let result = self.create_inner(id, code).await;
        self.logged(id, result).await
    }

    async fn create_inner(&self, id: &str, code: &str) -> Result<String, ToolError> {
        let dir = self.dir_of(id)?;
        remove_dir_if_exists(&dir)
            .await
            .map_err(|e| ToolError::storage(id, e))?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ToolError::storage(id, e))?;
        write_atomic(&dir, code)
            .await
            .map_err(|e| ToolError::storage(id, e))?;

        info!("Stored tool artifact: {}", id);
        Ok(code.to_string())
    }

    /// Replace the content of an existing artifact.
    #[instrument(skip(self, code))]
    pub async fn update(&self, id: &str, code: &str) -> Result<(), ToolError> {
        let result = self.update_inner(id, code).await;
        self.logged(id, result).await
    }

    async fn update_inner(&self, id: &str, code: &str) -> Result<(), ToolError> {
        let dir = self.dir_of(id)?;
        if !exists(&dir.join(ARTIFACT_FILE))
            .await
            .map_err(|e| ToolError::storage(id, e))?
        {
            return Err(ToolError::not_found(id));
        }
        write_atomic(&dir, code)
            .await
            .map_err(|e| ToolError::storage(id, e))?;

        info!("Updated tool artifact: {}", id);
        Ok(())
    }

    /// Remove an artifact. Removing an absent artifact succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ToolError> {
        let result = self.delete_inner(id).await;
        self.logged(id, result).await
    }

    async fn delete_inner(&self, id: &str) -> Result<(), ToolError> {
        let dir = self.dir_of(id)?;
        if remove_dir_if_exists(&dir)
            .await
            .map_err(|e| ToolError::storage(id, e))?
        {
            info!("Deleted tool artifact: {}", id);
        } else {
            debug!("Delete of absent tool artifact: {}", id);
        }
        Ok(())
    }

    /// Read the raw artifact.
    pub async fn get(&self, id: &str) -> Result<String, ToolError> {
        let result = self.read(id).await;
        self.logged(id, result).await
    }

    /// Read the raw artifact for download. The payload is the same as [`get`](Self::get).
    pub async fn export(&self, id: &str) -> Result<String, ToolError> {
        self.get(id).await
    }

    async fn read(&self, id: &str) -> Result<String, ToolError> {
        let path = self.dir_of(id)?.join(ARTIFACT_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(code) => Ok(code),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ToolError::not_found(id)),
            Err(e) => Err(ToolError::storage(id, e)),
        }
    }

    /// Identifiers of every stored artifact, sorted.
    ///
    /// Directories without an artifact or with a name that is not a valid
    /// identifier are skipped.
    pub async fn list(&self) -> Result<Vec<String>, ToolError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ToolError::storage("*", e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::storage("*", e))?
        {
            let Ok(id) = entry.file_name().into_string() else {
                continue;
            };
            let Ok(dir) = self.dir_of(&id) else {
                continue;
            };
            if matches!(exists(&dir.join(ARTIFACT_FILE)).await, Ok(true)) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn logged<T>(&self, id: &str, result: Result<T, ToolError>) -> Result<T, ToolError> {
        if let Err(e) = &result {
            self.failures.record(id, format!("{e}: {e:?}")).await;
        }
        result
    }
}

async fn exists(path: &Path) -> std::io::Result<bool> {
    tokio::fs::try_exists(path).await
}

/// Returns whether something was removed.
async fn remove_dir_if_exists(dir: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn write_atomic(dir: &Path, code: &str) -> std::io::Result<()> {
    let staging = dir.join(format!(".{}.{}", ARTIFACT_FILE, uuid::Uuid::new_v4().simple()));
    if let Err(e) = tokio::fs::write(&staging, code).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&staging, dir.join(ARTIFACT_FILE)).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: ToolCodeStore,
        logs: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");
        let store = ToolCodeStore::new(dir.path().join("tools"), FailureLog::new(&logs));
        Fixture {
            _dir: dir,
            store,
            logs,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_code() {
        let f = fixture();
        let stored = f.store.create("addTwo", "echo 5\n").await.unwrap();
        assert_eq!(stored, "echo 5\n");
        assert_eq!(f.store.get("addTwo").await.unwrap(), "echo 5\n");
        assert_eq!(f.store.export("addTwo").await.unwrap(), "echo 5\n");
    }

    #[tokio::test]
    async fn test_create_removes_stale_files() {
        let f = fixture();
        f.store.create("calc", "v1").await.unwrap();
        let dir = f.store.dir_of("calc").unwrap();
        std::fs::write(dir.join("leftover.txt"), "old").unwrap();

        f.store.create("calc", "v2").await.unwrap();

        assert!(!dir.join("leftover.txt").exists());
        assert_eq!(f.store.get("calc").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_update_replaces_content() {
        let f = fixture();
        f.store.create("calc", "v1").await.unwrap();
        f.store.update("calc", "v2").await.unwrap();
        assert_eq!(f.store.get("calc").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found_and_creates_nothing() {
        let f = fixture();
        let err = f.store.update("ghost", "code").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(!f.store.dir_of("ghost").unwrap().exists());
        assert!(matches!(
            f.store.get("ghost").await,
            Err(ToolError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let f = fixture();
        f.store.delete("ghost").await.unwrap();
        assert!(matches!(
            f.store.get("ghost").await,
            Err(ToolError::NotFound(_))
        ));

        f.store.create("calc", "v1").await.unwrap();
        f.store.delete("calc").await.unwrap();
        f.store.delete("calc").await.unwrap();
        assert!(matches!(
            f.store.get("calc").await,
            Err(ToolError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failures_are_logged() {
        let f = fixture();
        let _ = f.store.get("ghost").await;
        let content = std::fs::read_to_string(f.logs.join("ghost.log")).unwrap();
        assert!(content.contains("Tool not found: ghost"));
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_touches_disk() {
        let f = fixture();
        let err = f.store.create("../escape", "code").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidIdentifier(_)));
        assert!(!f.store.root().parent().unwrap().join("escape").exists());
    }

    #[tokio::test]
    async fn test_global_bucket_name_cannot_be_a_tool() {
        let f = fixture();
        f.store.create("calc", "v1").await.unwrap();
        let _ = f.store.get("missing").await;

        let err = f.store.create("global", "code").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidIdentifier(_)));
        assert!(!f.store.root().join("global").exists());

        // The global bucket only ever holds process-level records.
        let global = std::fs::read_to_string(f.logs.join("global.log")).unwrap();
        assert!(global.contains("reserved"));
        assert!(!global.contains("missing"));
    }

    #[tokio::test]
    async fn test_list_skips_foreign_entries() {
        let f = fixture();
        assert!(f.store.list().await.unwrap().is_empty());

        f.store.create("b", "code").await.unwrap();
        f.store.create("a", "code").await.unwrap();
        std::fs::create_dir_all(f.store.root().join("no_artifact")).unwrap();
        std::fs::write(f.store.root().join("stray.txt"), "x").unwrap();

        assert_eq!(f.store.list().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_no_staging_files_left_behind() {
        let f = fixture();
        f.store.create("calc", "v1").await.unwrap();
        f.store.update("calc", "v2").await.unwrap();

        let names: Vec<_> = std::fs::read_dir(f.store.dir_of("calc").unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![ARTIFACT_FILE]);
    }
}
