//! Append-only failure records.
//!
//! Every tool identifier gets its own `<logs_dir>/<id>.log`. Faults that cannot
//! be attributed to a tool (panics in any task) land in `global.log` through the
//! panic hook installed by [`FailureLog::install_panic_hook`]. Records are never
//! read back by the server.

use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{error, warn};

use super::security::validate_tool_id;

/// Name of the bucket used for faults not tied to a tool.
pub const GLOBAL_BUCKET: &str = "global";

/// Writer for per-tool and global failure records.
#[derive(Debug, Clone)]
pub struct FailureLog {
    dir: PathBuf,
}

impl FailureLog {
    /// Create a failure log rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for `bucket`.
    ///
    /// Identifiers that are not valid tool ids share the global bucket so a
    /// malformed id can never pick the file name.
    pub fn path_for(&self, bucket: &str) -> PathBuf {
        let name = match validate_tool_id(bucket) {
            Ok(id) => id,
            Err(_) => GLOBAL_BUCKET,
        };
        self.dir.join(format!("{name}.log"))
    }

    /// Append a failure record for `tool_id`.
    ///
    /// Writing the record is best effort: a failure to write is reported through
    /// tracing and otherwise swallowed, since the caller is already on an error path.
    pub async fn record(&self, tool_id: &str, detail: impl Display) {
        let entry = format_entry(&detail);
        error!(tool = tool_id, "{}", detail);

        if let Err(e) = self.append(tool_id, &entry).await {
            warn!("Failed to write failure record for {}: {}", tool_id, e);
        }
    }

    async fn append(&self, tool_id: &str, entry: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(tool_id))
            .await?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }

    /// Append a record to the global bucket synchronously.
    ///
    /// Used from the panic hook, where no runtime may be available.
    pub fn record_global_blocking(&self, detail: impl Display) {
        let entry = format_entry(&detail);
        let result = std::fs::create_dir_all(&self.dir).and_then(|_| {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(GLOBAL_BUCKET))?;
            file.write_all(entry.as_bytes())
        });
        if let Err(e) = result {
            eprintln!("failed to write global failure record: {e}");
        }
    }

    /// Route panics from any thread or task into the global bucket.
    ///
    /// The previous hook still runs afterwards, so default stderr reporting stays.
    pub fn install_panic_hook(&self) {
        let log = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            log.record_global_blocking(format!("Uncaught: {info}"));
            previous(info);
        }));
    }
}

fn format_entry(detail: &dyn Display) -> String {
    format!("---\n[{}] {}\n", chrono::Utc::now().to_rfc3339(), detail)
}
