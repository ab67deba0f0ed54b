//! Response normalization into `{ value, label }` options.
//!
//! Normalization is strict: one malformed candidate fails the whole field.
//! Order is preserved and duplicates are kept.

use nac_types::{FieldMapping, ResultMapping, SelectOption};
use serde_json::Value;

use crate::ResolveError;

/// Extract the candidate array named by `mapping.attribute` and map each element.
///
/// # Errors
/// [`ResolveError::Shape`] when the attribute is absent or not an array, or
/// when any element lacks a usable value or label.
pub fn normalize(response: &Value, mapping: &ResultMapping) -> Result<Vec<SelectOption>, ResolveError> {
    let candidates = select_attribute(response, &mapping.attribute)?;
    let Value::Array(items) = candidates else {
        return Err(ResolveError::shape(format!(
            "attribute '{}' is {}, expected an array",
            display_attribute(&mapping.attribute),
            json_kind(candidates)
        )));
    };
    normalize_entries(items, &mapping.fields)
}

/// Map already extracted candidates to options.
pub fn normalize_entries(items: &[Value], fields: &FieldMapping) -> Result<Vec<SelectOption>, ResolveError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| normalize_entry(index, item, fields))
        .collect()
}

fn normalize_entry(index: usize, item: &Value, fields: &FieldMapping) -> Result<SelectOption, ResolveError> {
    let Value::Object(entry) = item else {
        return Err(ResolveError::shape(format!("element {index} is {}, expected an object", json_kind(item))));
    };

    let value = match entry.get(&fields.id) {
        None | Some(Value::Null) => {
            return Err(ResolveError::shape(format!("element {index} has no value for key '{}'", fields.id)));
        }
        Some(value) => value.clone(),
    };

    let label = match entry.get(&fields.name) {
        Some(Value::String(text)) => text.clone(),
        Some(scalar) if matches!(scalar, Value::Number(_) | Value::Bool(_)) => scalar.to_string(),
        Some(other) => {
            return Err(ResolveError::shape(format!(
                "element {index} has a {} label under key '{}'",
                json_kind(other),
                fields.name
            )));
        }
        None => return Err(ResolveError::shape(format!("element {index} has no label for key '{}'", fields.name))),
    };

    Ok(SelectOption { value, label })
}

fn select_attribute<'a>(response: &'a Value, attribute: &str) -> Result<&'a Value, ResolveError> {
    let path = attribute.trim();
    if path.is_empty() || path == "." {
        return Ok(response);
    }

    let mut current = response;
    for segment in path.trim_start_matches('.').split('.') {
        current = current
            .as_object()
            .and_then(|object| object.get(segment))
            .ok_or_else(|| ResolveError::shape(format!("response has no attribute '{path}'")))?;
    }
    Ok(current)
}

fn display_attribute(attribute: &str) -> &str {
    if attribute.trim().is_empty() { "." } else { attribute }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
