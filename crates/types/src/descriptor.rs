//! Value-source descriptors.
//!
//! A descriptor declares where a form field obtains its selectable values.
//! Raw descriptors arrive as JSON objects whose variant is implied by which
//! keys are present. [`ValueSource::from_value`] settles the variant once, at
//! construction time, so downstream code never inspects keys again.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Keys that select a descriptor variant. Exactly one may be present.
const DISCRIMINANT_KEYS: &[&str] = &["api", "link", "call", "dictionary"];

/// Scope marker that binds a `link` descriptor to the current page.
const PAGE_SCOPE: &str = "page";

/// Contract violation detected while constructing a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("descriptor declares none of the keys {expected:?}")]
    MissingDiscriminant { expected: Vec<&'static str> },

    #[error("descriptor is ambiguous; it declares {keys:?}")]
    Ambiguous { keys: Vec<String> },

    #[error("descriptor key '{key}' must be {expected}")]
    InvalidKey { key: String, expected: &'static str },
}

/// Values come from a URL, relative to the `generate` base path unless
/// `nolocation` marks the link as already absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub link: String,
    #[serde(default)]
    pub nolocation: bool,
}

/// Values come from a named remote procedure posted as `{ call: value }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCallDescriptor {
    pub call: String,
    #[serde(default)]
    pub value: Value,
}

/// Page-bound descriptor resolved against the current page instead of a
/// configured base path.
#[derive(Debug, Clone, PartialEq)]
pub enum PageDescriptor {
    /// Post `{ call: parameters }` to the current page with the AJAX marker.
    Api { call: String, parameters: Value },
    /// Fetch the link verbatim.
    Link { link: String },
}

/// Values come from a static dictionary table, addressed by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryDescriptor {
    pub dictionary_type: String,
}

/// Declarative description of where a field's selectable values come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ValueSource {
    Link(LinkDescriptor),
    ApiCall(ApiCallDescriptor),
    Page(PageDescriptor),
    Dictionary(DictionaryDescriptor),
}

impl ValueSource {
    /// Link relative to the configured `generate` base path.
    pub fn link(link: impl Into<String>) -> Self {
        Self::Link(LinkDescriptor {
            link: link.into(),
            nolocation: false,
        })
    }

    /// Link used verbatim.
    pub fn absolute_link(link: impl Into<String>) -> Self {
        Self::Link(LinkDescriptor {
            link: link.into(),
            nolocation: true,
        })
    }

    pub fn api_call(call: impl Into<String>, value: Value) -> Self {
        Self::ApiCall(ApiCallDescriptor { call: call.into(), value })
    }

    pub fn page_api(call: impl Into<String>, parameters: Value) -> Self {
        Self::Page(PageDescriptor::Api {
            call: call.into(),
            parameters,
        })
    }

    pub fn page_link(link: impl Into<String>) -> Self {
        Self::Page(PageDescriptor::Link { link: link.into() })
    }

    pub fn dictionary(dictionary_type: impl Into<String>) -> Self {
        Self::Dictionary(DictionaryDescriptor {
            dictionary_type: dictionary_type.into(),
        })
    }

    /// Parse a raw descriptor object, selecting the variant from the keys it carries.
    ///
    /// Precedence:
    /// - more than one of `api`, `link`, `call`, `dictionary` is ambiguous
    /// - `api` selects a page-bound API call
    /// - `link` with `"scope": "page"` selects a page-bound link
    /// - `link` selects a link (`nolocation` defaults to `false`)
    /// - `call` selects an API call (`value` defaults to `null`)
    /// - `dictionary` selects a dictionary lookup
    ///
    /// # Errors
    /// Returns a [`DescriptorError`] when the object is not a descriptor at all,
    /// is ambiguous, or carries a discriminant of the wrong type.
    pub fn from_value(raw: &Value) -> Result<Self, DescriptorError> {
        let object = raw.as_object().ok_or(DescriptorError::NotAnObject { found: json_kind(raw) })?;
        let present: Vec<&'static str> = DISCRIMINANT_KEYS
            .iter()
            .copied()
            .filter(|key| object.contains_key(*key))
            .collect();

        if present.len() > 1 {
            return Err(DescriptorError::Ambiguous {
                keys: present.iter().map(|key| key.to_string()).collect(),
            });
        }

        match present.first().copied() {
            Some("api") => parse_page_api(object),
            Some("link") => parse_link(object),
            Some("call") => parse_api_call(object),
            Some("dictionary") => parse_dictionary(object),
            _ => Err(DescriptorError::MissingDiscriminant {
                expected: DISCRIMINANT_KEYS.to_vec(),
            }),
        }
    }

    /// Raw descriptor form, the inverse of [`ValueSource::from_value`].
    pub fn to_value(&self) -> Value {
        match self {
            ValueSource::Link(descriptor) => json!({ "link": descriptor.link, "nolocation": descriptor.nolocation }),
            ValueSource::ApiCall(descriptor) => json!({ "call": descriptor.call, "value": descriptor.value }),
            ValueSource::Page(PageDescriptor::Api { call, parameters }) => {
                json!({ "api": { "call": call, "parameters": parameters } })
            }
            ValueSource::Page(PageDescriptor::Link { link }) => json!({ "link": link, "scope": PAGE_SCOPE }),
            ValueSource::Dictionary(descriptor) => json!({ "dictionary": descriptor.dictionary_type }),
        }
    }

    /// Short variant name used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueSource::Link(_) => "link",
            ValueSource::ApiCall(_) => "api_call",
            ValueSource::Page(_) => "page",
            ValueSource::Dictionary(_) => "dictionary",
        }
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, ValueSource::Dictionary(_))
    }

    /// Dictionary type for dictionary sources.
    pub fn dictionary_type(&self) -> Option<&str> {
        match self {
            ValueSource::Dictionary(descriptor) => Some(&descriptor.dictionary_type),
            _ => None,
        }
    }

    /// Whether building a request for this source needs the hosting page.
    pub fn requires_page_context(&self) -> bool {
        matches!(self, ValueSource::Page(PageDescriptor::Api { .. }))
    }
}

impl TryFrom<Value> for ValueSource {
    type Error = DescriptorError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        ValueSource::from_value(&raw)
    }
}

impl From<ValueSource> for Value {
    fn from(source: ValueSource) -> Self {
        source.to_value()
    }
}

fn parse_link(object: &Map<String, Value>) -> Result<ValueSource, DescriptorError> {
    let link = required_string(object, "link")?;
    let nolocation = match object.get("nolocation") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(DescriptorError::InvalidKey {
                key: "nolocation".into(),
                expected: "a boolean",
            });
        }
    };

    match object.get("scope") {
        None | Some(Value::Null) => Ok(ValueSource::Link(LinkDescriptor { link, nolocation })),
        Some(Value::String(scope)) if scope == PAGE_SCOPE => {
            if object.contains_key("nolocation") {
                return Err(DescriptorError::InvalidKey {
                    key: "nolocation".into(),
                    expected: "absent on page-scoped links",
                });
            }
            Ok(ValueSource::page_link(link))
        }
        Some(_) => Err(DescriptorError::InvalidKey {
            key: "scope".into(),
            expected: "\"page\" when present",
        }),
    }
}

fn parse_api_call(object: &Map<String, Value>) -> Result<ValueSource, DescriptorError> {
    let call = required_string(object, "call")?;
    let value = object.get("value").cloned().unwrap_or(Value::Null);
    Ok(ValueSource::api_call(call, value))
}

fn parse_page_api(object: &Map<String, Value>) -> Result<ValueSource, DescriptorError> {
    let api = object.get("api").and_then(Value::as_object).ok_or(DescriptorError::InvalidKey {
        key: "api".into(),
        expected: "an object with a 'call' key",
    })?;
    let call = required_string(api, "call").map_err(|_| DescriptorError::InvalidKey {
        key: "api.call".into(),
        expected: "a non-empty string",
    })?;
    let parameters = api.get("parameters").cloned().unwrap_or(Value::Null);
    Ok(ValueSource::page_api(call, parameters))
}

fn parse_dictionary(object: &Map<String, Value>) -> Result<ValueSource, DescriptorError> {
    match object.get("dictionary") {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(ValueSource::dictionary(text.trim())),
        Some(Value::Number(number)) => Ok(ValueSource::dictionary(number.to_string())),
        _ => Err(DescriptorError::InvalidKey {
            key: "dictionary".into(),
            expected: "a non-empty string or a number",
        }),
    }
}

fn required_string(object: &Map<String, Value>, key: &str) -> Result<String, DescriptorError> {
    match object.get(key) {
        Some(Value::String(text)) if !text.is_empty() => Ok(text.clone()),
        _ => Err(DescriptorError::InvalidKey {
            key: key.to_string(),
            expected: "a non-empty string",
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
