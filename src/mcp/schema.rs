//! Tool Input Schemas
//!
//! Typed parameter descriptions for tool inputs. A schema renders itself as
//! the JSON Schema object advertised by `tools/list` and validates call
//! arguments before any handler sees them.

use crate::mcp::protocol::Tool;
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Parameter '{name}' must be of type {expected}")]
    InvalidType { name: String, expected: String },

    #[error("Parameter '{name}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    InvalidEnumValue {
        name: String,
        value: String,
        allowed: Vec<String>,
    },
}

/// The shape a parameter value must have
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Array { items: Box<ParamKind> },
    Enum { values: Vec<String> },
}

impl ParamKind {
    #[inline]
    pub fn array_of(items: Self) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    #[inline]
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::String | Self::Enum { .. } => "string",
            Self::Array { .. } => "array",
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Array { items } => json!({
                "type": "array",
                "items": items.to_json_schema()
            }),
            Self::Enum { values } => json!({
                "type": "string",
                "enum": values
            }),
        }
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), SchemaError> {
        match (self, value) {
            (Self::String, Value::String(_)) => Ok(()),
            (Self::Array { items }, Value::Array(elements)) => elements
                .iter()
                .enumerate()
                .try_for_each(|(i, element)| items.check(&format!("{}[{}]", name, i), element)),
            (Self::Enum { values }, Value::String(s)) => {
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(SchemaError::InvalidEnumValue {
                        name: name.to_string(),
                        value: s.clone(),
                        allowed: values.clone(),
                    })
                }
            }
            _ => Err(SchemaError::InvalidType {
                name: name.to_string(),
                expected: self.type_name().to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParamSchema {
    #[inline]
    pub fn required(name: &str, description: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    #[inline]
    pub fn optional(name: &str, description: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: false,
            default: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Ordered set of parameters accepted by a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    params: Vec<ParamSchema>,
}

impl InputSchema {
    #[inline]
    pub fn new(params: Vec<ParamSchema>) -> Self {
        Self { params }
    }

    /// Render as a JSON Schema object
    #[inline]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut property = param.kind.to_json_schema();
            if let Value::Object(obj) = &mut property {
                obj.insert(
                    "description".to_string(),
                    Value::String(param.description.clone()),
                );
                if let Some(default) = &param.default {
                    obj.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Check `arguments` against the schema and return them with defaults
    /// filled in. Unknown arguments pass through untouched. An explicit
    /// `null` counts as absent.
    #[inline]
    pub fn validate(
        &self,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Map<String, Value>, SchemaError> {
        let mut arguments = arguments.unwrap_or_default();

        for param in &self.params {
            if let Some(value) = arguments.get(&param.name).filter(|v| !v.is_null()) {
                param.kind.check(&param.name, value)?;
                continue;
            }

            if let Some(default) = &param.default {
                arguments.insert(param.name.clone(), default.clone());
            } else if param.required {
                return Err(SchemaError::MissingParameter(param.name.clone()));
            } else {
                arguments.remove(&param.name);
            }
        }

        Ok(arguments)
    }
}

/// A tool as registered with the server: its name, what it does and what
/// arguments it takes
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDefinition {
    #[inline]
    pub fn new(name: &str, description: &str, input_schema: InputSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    /// Protocol view advertised by `tools/list`
    #[inline]
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.to_json_schema(),
        }
    }
}
