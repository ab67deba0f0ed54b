//! Form-level declarations consumed by the resolution orchestrator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{PageContext, ResultMapping, ValueSource};

/// Identifier of a form field.
pub type FieldId = String;

/// Everything needed to resolve one field's options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub source: ValueSource,
    /// For dictionary sources only `fields` applies, and it may only name
    /// `id`, `name` or `type`.
    #[serde(default)]
    pub mapping: ResultMapping,
    /// Fields whose resolution must complete before this one is dispatched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<FieldId>,
}

impl FieldSpec {
    pub fn new(source: ValueSource, mapping: ResultMapping) -> Self {
        Self {
            source,
            mapping,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, field_id: impl Into<FieldId>) -> Self {
        self.depends_on.push(field_id.into());
        self
    }
}

/// Current state of the form the fields belong to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormContext {
    /// Values the user has entered or selected so far.
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub page: Option<PageContext>,
}

impl FormContext {
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_page(mut self, page: PageContext) -> Self {
        self.page = Some(page);
        self
    }
}

/// A form document: field declarations plus optional initial values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDocument {
    pub fields: IndexMap<FieldId, FieldSpec>,
    #[serde(default)]
    pub values: Map<String, Value>,
    #[serde(default)]
    pub page: Option<PageContext>,
}

impl FormDocument {
    pub fn context(&self) -> FormContext {
        FormContext {
            values: self.values.clone(),
            page: self.page.clone(),
        }
    }
}
