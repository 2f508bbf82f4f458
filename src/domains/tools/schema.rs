//! Parameter schemas declared by tool artifacts.
//!
//! A schema maps parameter names to a small set of JSON types. It validates
//! incoming arguments (naming the first offending field) and renders itself as
//! the JSON Schema object advertised in `tools/list`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::error::ToolError;

/// JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Any,
}

impl ParamType {
    /// Whether `value` is an instance of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

/// One parameter as written in the front matter.
///
/// Either the bare type name (`a: number`) or the long form with a
/// description and an `optional` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSpec {
    Short(ParamType),
    Detailed {
        #[serde(rename = "type")]
        kind: ParamType,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        optional: bool,
    },
}

impl ParamSpec {
    pub fn kind(&self) -> ParamType {
        match self {
            Self::Short(kind) | Self::Detailed { kind, .. } => *kind,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Detailed { optional: true, .. })
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Short(_) => None,
            Self::Detailed { description, .. } => description.as_deref(),
        }
    }
}

/// Declared parameters of a tool, keyed by name.
///
/// A tool without front matter has no schema at all, which is different
/// from an empty schema: see [`ToolSchema::validate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Option<BTreeMap<String, ParamSpec>>,
}

impl ToolSchema {
    /// Schema that accepts any object and passes it through untouched.
    pub fn unchecked() -> Self {
        Self { params: None }
    }

    /// Schema with the given declared parameters.
    pub fn declared(params: BTreeMap<String, ParamSpec>) -> Self {
        Self {
            params: Some(params),
        }
    }

    pub fn params(&self) -> Option<&BTreeMap<String, ParamSpec>> {
        self.params.as_ref()
    }

    /// Validate an argument payload.
    ///
    /// `null` counts as an empty object. With a declared schema only declared
    /// parameters are kept; undeclared keys are dropped.
    pub fn validate(&self, arguments: Value) -> Result<Map<String, Value>, ToolError> {
        let mut arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(ToolError::invalid_arguments(
                    "arguments",
                    format!("must be an object, got {}", json_type_name(&other)),
                ));
            }
        };

        let Some(params) = &self.params else {
            return Ok(arguments);
        };

        let mut validated = Map::new();
        for (name, spec) in params {
            match arguments.remove(name) {
                None | Some(Value::Null) if spec.is_optional() => {}
                None => return Err(ToolError::invalid_arguments(name, "is required")),
                Some(value) => {
                    if !spec.kind().accepts(&value) {
                        return Err(ToolError::invalid_arguments(
                            name,
                            format!(
                                "expected {}, got {}",
                                spec.kind().name(),
                                json_type_name(&value)
                            ),
                        ));
                    }
                    validated.insert(name.clone(), value);
                }
            }
        }
        Ok(validated)
    }

    /// JSON Schema object describing the arguments.
    pub fn to_json_schema(&self) -> Arc<Map<String, Value>> {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));

        if let Some(params) = &self.params {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for (name, spec) in params {
                let mut property = Map::new();
                if spec.kind() != ParamType::Any {
                    property.insert("type".to_string(), json!(spec.kind().name()));
                }
                if let Some(description) = spec.description() {
                    property.insert("description".to_string(), json!(description));
                }
                properties.insert(name.clone(), Value::Object(property));
                if !spec.is_optional() {
                    required.push(json!(name));
                }
            }
            schema.insert("properties".to_string(), Value::Object(properties));
            schema.insert("required".to_string(), Value::Array(required));
        }

        Arc::new(schema)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
