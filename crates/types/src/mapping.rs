//! Result mappings and the normalized options they produce.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declares which response key holds the candidate sequence and which keys of
/// each candidate become the option value and label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMapping {
    /// Dotted path to the candidate array; `""` or `"."` addresses the root.
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub fields: FieldMapping,
}

impl ResultMapping {
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            fields: FieldMapping::default(),
        }
    }

    pub fn with_fields(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.fields = FieldMapping {
            id: id.into(),
            name: name.into(),
        };
        self
    }
}

impl Default for ResultMapping {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Keys of a candidate element used for the option value (`id`) and label (`name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub id: String,
    pub name: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            id: "id".into(),
            name: "name".into(),
        }
    }
}

/// A normalized `{ value, label }` pair ready for a selection control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}
