//! Tool artifact parsing.
//!
//! An artifact is the raw source stored for a tool: an optional YAML front
//! matter block between two `---` lines, followed by the handler body.
//!
//! ```text
//! ---
//! description: Adds a and b
//! params:
//!   a: number
//!   b: number
//! ---
//! echo $((TOOL_ARG_a + TOOL_ARG_b))
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use super::error::ToolError;
use super::schema::{ParamSpec, ToolSchema};

const FENCE: &str = "---";

/// Front matter fields recognised in an artifact.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrontMatter {
    /// Must match the identifier the artifact is stored under, when present.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub params: Option<BTreeMap<String, ParamSpec>>,

    /// Program and leading arguments; the body is appended as the last argument.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// A parsed, validated artifact.
#[derive(Debug, Clone)]
pub struct ToolManifest {
    pub description: String,
    pub schema: ToolSchema,
    pub command: Option<Vec<String>>,
    pub body: String,
}

impl ToolManifest {
    /// Parse the artifact stored under `id`.
    ///
    /// Rejects malformed or unterminated front matter, a `name` that differs
    /// from `id`, an empty `command` and a blank body.
    pub fn parse(id: &str, source: &str) -> Result<Self, ToolError> {
        let (front, body) = split_front_matter(source)
            .ok_or_else(|| ToolError::load_failure(id, "unterminated front matter"))?;

        let front: FrontMatter = match front {
            Some(yaml) if !yaml.trim().is_empty() => serde_yaml::from_str(yaml)
                .map_err(|e| ToolError::load_failure(id, format!("invalid front matter: {e}")))?,
            _ => FrontMatter::default(),
        };

        if let Some(name) = front.name.as_deref().filter(|name| *name != id) {
            return Err(ToolError::load_failure(
                id,
                format!("declares name '{name}' but is stored as '{id}'"),
            ));
        }

        let names_program = front
            .command
            .as_ref()
            .map(|command| command.first().is_some_and(|p| !p.trim().is_empty()));
        if names_program == Some(false) {
            return Err(ToolError::load_failure(id, "command must name a program"));
        }

        if body.trim().is_empty() {
            return Err(ToolError::load_failure(id, "no handler body"));
        }

        let schema = match front.params {
            Some(params) => ToolSchema::declared(params),
            None => ToolSchema::unchecked(),
        };

        Ok(Self {
            description: front.description.unwrap_or_default(),
            schema,
            command: front.command,
            body: body.to_string(),
        })
    }
}

/// Split `source` into (front matter, body).
///
/// Returns `None` when an opening fence has no closing fence.
fn split_front_matter(source: &str) -> Option<(Option<&str>, &str)> {
    let Some(rest) = strip_fence_line(source) else {
        return Some((None, source));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((Some(front), body));
        }
        offset += line.len();
    }
    None
}

fn strip_fence_line(source: &str) -> Option<&str> {
    let rest = source.strip_prefix(FENCE)?;
    rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::schema::ParamType;

    const ADD_TWO: &str = "---\ndescription: Adds a and b\nparams:\n  a: number\n  b:\n    type: number\n    description: Second operand\n---\necho $((TOOL_ARG_a + TOOL_ARG_b))\n";

    #[test]
    fn test_parse_full_artifact() {
        let manifest = ToolManifest::parse("addTwo", ADD_TWO).unwrap();
        assert_eq!(manifest.description, "Adds a and b");
        assert_eq!(manifest.body, "echo $((TOOL_ARG_a + TOOL_ARG_b))\n");
        assert!(manifest.command.is_none());

        let params = manifest.schema.params().unwrap();
        assert_eq!(params["a"].kind(), ParamType::Number);
        assert_eq!(params["b"].description(), Some("Second operand"));
    }

    #[test]
    fn test_parse_without_front_matter() {
        let manifest = ToolManifest::parse("hello", "echo hello\n").unwrap();
        assert_eq!(manifest.description, "");
        assert!(manifest.schema.params().is_none());
        assert_eq!(manifest.body, "echo hello\n");
    }

    #[test]
    fn test_parse_crlf_fences() {
        let source = "---\r\ndescription: crlf\r\n---\r\necho ok\r\n";
        let manifest = ToolManifest::parse("crlf", source).unwrap();
        assert_eq!(manifest.description, "crlf");
        assert_eq!(manifest.body, "echo ok\r\n");
    }

    #[test]
    fn test_unterminated_front_matter_rejected() {
        let err = ToolManifest::parse("broken", "---\ndescription: x\necho hi\n").unwrap_err();
        assert!(matches!(err, ToolError::LoadFailure { .. }));
    }

    #[test]
    fn test_blank_body_rejected() {
        let err = ToolManifest::parse("empty", "---\ndescription: nothing\n---\n  \n").unwrap_err();
        assert!(err.to_string().contains("no handler body"));
    }

    #[test]
    fn test_name_mismatch_rejected() {
        let err = ToolManifest::parse("addTwo", "---\nname: other\n---\necho 1\n").unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = ToolManifest::parse("x", "---\ncommand: []\n---\necho 1\n").unwrap_err();
        assert!(err.to_string().contains("command"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ToolManifest::parse("x", "---\nrun: nope\n---\necho 1\n").unwrap_err();
        assert!(err.to_string().contains("invalid front matter"));
    }

    #[test]
    fn test_unknown_param_type_rejected() {
        let source = "---\nparams:\n  a: decimal\n---\necho 1\n";
        assert!(ToolManifest::parse("x", source).is_err());
    }
}
