use std::path::{Path, PathBuf};

use crate::core::failure_log::GLOBAL_BUCKET;

/// Longest identifier accepted as a directory name.
pub const MAX_TOOL_ID_LEN: usize = 128;

/// Errors that can occur during identifier validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Tool identifier must not be empty")]
    Empty,

    #[error("Tool identifier is longer than {MAX_TOOL_ID_LEN} bytes")]
    TooLong,

    #[error("Tool identifier '{id}' must not start with '.'")]
    LeadingDot { id: String },

    #[error("Tool identifier '{id}' contains invalid character {ch:?}")]
    InvalidCharacter { id: String, ch: char },

    #[error("Tool identifier '{id}' is reserved")]
    Reserved { id: String },
}

/// Validates that a tool identifier can be used as a single directory name.
///
/// Accepted identifiers are non-empty ASCII made of letters, digits, `_`, `-`
/// and `.`, not starting with `.`. This rules out separators, `..` and hidden
/// entries before any filesystem access happens. The name of the global
/// failure bucket is reserved in any letter case.
///
/// # Examples
///
/// ```rust
/// use dynamic_tool_server::core::security::validate_tool_id;
///
/// assert!(validate_tool_id("addTwo").is_ok());
/// assert!(validate_tool_id("../etc").is_err());
/// ```
pub fn validate_tool_id(id: &str) -> Result<&str, IdentifierError> {
    if id.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if id.len() > MAX_TOOL_ID_LEN {
        return Err(IdentifierError::TooLong);
    }
    if id.starts_with('.') {
        return Err(IdentifierError::LeadingDot { id: id.to_string() });
    }
    if let Some(ch) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(IdentifierError::InvalidCharacter {
            id: id.to_string(),
            ch,
        });
    }
    if id.eq_ignore_ascii_case(GLOBAL_BUCKET) {
        return Err(IdentifierError::Reserved { id: id.to_string() });
    }
    Ok(id)
}

/// Resolves the storage directory of a tool under `root`.
pub fn tool_dir(root: &Path, id: &str) -> Result<PathBuf, IdentifierError> {
    let id = validate_tool_id(id)?;
    Ok(root.join(id))
}
