//! Tool-specific error types.

use thiserror::Error;

use crate::core::security::IdentifierError;

/// Errors that can occur during tool operations.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No stored artifact exists for the identifier.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The identifier is not registered at invocation time.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments failed schema validation.
    #[error("Invalid arguments: '{field}' {reason}")]
    InvalidArguments { field: String, reason: String },

    /// The stored artifact could not be turned into a loaded tool.
    #[error("Failed to load tool {id}: {reason}")]
    LoadFailure { id: String, reason: String },

    /// The tool's own logic failed while executing.
    #[error("Tool execution failed: {0}")]
    HandlerFailure(String),

    /// Reading or writing the tool store failed.
    #[error("Storage failure for {id}: {source}")]
    StorageFailure {
        id: String,
        #[source]
        source: std::io::Error,
    },

    /// The identifier cannot be used as a storage key.
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a new "unknown tool" error.
    pub fn unknown_tool(id: impl Into<String>) -> Self {
        Self::UnknownTool(id.into())
    }

    /// Create a new "invalid arguments" error for a single field.
    pub fn invalid_arguments(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a new load failure.
    pub fn load_failure(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailure {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new handler failure.
    pub fn handler_failure(msg: impl Into<String>) -> Self {
        Self::HandlerFailure(msg.into())
    }

    /// Create a new storage failure.
    pub fn storage(id: impl Into<String>, source: std::io::Error) -> Self {
        Self::StorageFailure {
            id: id.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_names_field() {
        let err = ToolError::invalid_arguments("a", "is required");
        assert_eq!(err.to_string(), "Invalid arguments: 'a' is required");
        assert!(matches!(err, ToolError::InvalidArguments { ref field, .. } if field == "a"));
    }

    #[test]
    fn test_storage_failure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ToolError::storage("calc", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("calc"));
    }
}
