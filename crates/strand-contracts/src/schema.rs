//! Declarative parameter schema types.
//!
//! An action declares its parameters as a list of `FieldSpec`s. The
//! validator (see strand-schema) checks and coerces incoming params against
//! that list before the action body runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value type a parameter must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Any,
    String,
    Integer,
    Float,
    /// Integer or float.
    Number,
    Boolean,
    Map,
    List,
}

impl FieldType {
    /// The JSON Schema `type` keyword for this field type, or `None` for
    /// `Any`.
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Float | Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Map => Some("object"),
            Self::List => Some("array"),
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Filled in when the caller omits the field.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub doc: String,
    /// Extra JSON Schema keywords for this field (e.g. `minimum`, `enum`).
    #[serde(default)]
    pub constraints: Option<Value>,
}

impl FieldSpec {
    /// An optional field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            doc: String::new(),
            constraints: None,
        }
    }

    /// A required field of the given type.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn with_constraints(mut self, constraints: Value) -> Self {
        self.constraints = Some(constraints);
        self
    }
}
