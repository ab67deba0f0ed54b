//! `${{ ... }}` bindings inside descriptors.
//!
//! Descriptors may depend on other field values:
//!
//! - `${{ form.<key> }}` reads the form's current value for `<key>`
//! - `${{ fields.<id> }}` reads the option values of an already resolved field,
//!   which must be listed in the descriptor's `depends_on`
//!
//! A string that is exactly one template is replaced by the raw JSON value. A
//! template embedded in a longer string is replaced by its text form, which is
//! additionally percent-encoded when the string is a link.

use indexmap::IndexMap;
use nac_types::{FieldId, PageDescriptor, SelectOption, ValueSource};
use nac_util::encode_path_segment;
use serde_json::{Map, Value};

use crate::ResolveError;

const FORM_PREFIX: &str = "form.";
const FIELDS_PREFIX: &str = "fields.";

/// Values visible to a field's bindings.
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    pub form: &'a Map<String, Value>,
    /// Options of fields that resolved successfully so far.
    pub resolved: &'a IndexMap<FieldId, Vec<SelectOption>>,
    /// Fields the bound descriptor declared as dependencies.
    pub declared: &'a [FieldId],
}

/// Extracts template expressions from a string value, without delimiters.
fn extract_template_expressions(value: &str) -> Vec<String> {
    let mut expressions = Vec::new();
    let mut remainder = value;

    while let Some(start) = remainder.find("${{") {
        let after_start = &remainder[start + 3..];
        let Some(end) = after_start.find("}}") else {
            break;
        };
        let expression = after_start[..end].trim();
        if !expression.is_empty() {
            expressions.push(expression.to_string());
        }
        remainder = &after_start[end + 2..];
    }

    expressions
}

/// Field identifiers referenced through `fields.<id>` anywhere in the descriptor.
pub fn field_references(source: &ValueSource) -> Vec<FieldId> {
    let mut references = Vec::new();
    let mut collect = |text: &str| {
        for expression in extract_template_expressions(text) {
            if let Some(field_id) = expression.strip_prefix(FIELDS_PREFIX)
                && !references.iter().any(|known: &FieldId| known == field_id)
            {
                references.push(field_id.to_string());
            }
        }
    };

    match source {
        ValueSource::Link(descriptor) => collect(&descriptor.link),
        ValueSource::Page(PageDescriptor::Link { link }) => collect(link),
        ValueSource::ApiCall(descriptor) => visit_strings(&descriptor.value, &mut collect),
        ValueSource::Page(PageDescriptor::Api { parameters, .. }) => visit_strings(parameters, &mut collect),
        ValueSource::Dictionary(_) => {}
    }
    references
}

/// Substitute every binding in the descriptor, yielding a binding-free descriptor.
pub fn bind_source(source: &ValueSource, context: &BindingContext<'_>) -> Result<ValueSource, ResolveError> {
    Ok(match source {
        ValueSource::Link(descriptor) => {
            let mut bound = descriptor.clone();
            bound.link = interpolate_link(&descriptor.link, context)?;
            ValueSource::Link(bound)
        }
        ValueSource::ApiCall(descriptor) => ValueSource::api_call(descriptor.call.clone(), interpolate_value(&descriptor.value, context)?),
        ValueSource::Page(PageDescriptor::Api { call, parameters }) => {
            ValueSource::page_api(call.clone(), interpolate_value(parameters, context)?)
        }
        ValueSource::Page(PageDescriptor::Link { link }) => ValueSource::page_link(interpolate_link(link, context)?),
        ValueSource::Dictionary(_) => source.clone(),
    })
}

/// Interpolate bindings through a JSON value tree.
pub fn interpolate_value(value: &Value, context: &BindingContext<'_>) -> Result<Value, ResolveError> {
    match value {
        Value::String(text) => interpolate_text(text, context, false),
        Value::Array(items) => items
            .iter()
            .map(|item| interpolate_value(item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut bound = Map::with_capacity(map.len());
            for (key, nested) in map {
                bound.insert(key.clone(), interpolate_value(nested, context)?);
            }
            Ok(Value::Object(bound))
        }
        other => Ok(other.clone()),
    }
}

fn interpolate_link(link: &str, context: &BindingContext<'_>) -> Result<String, ResolveError> {
    match interpolate_text(link, context, true)? {
        Value::String(text) => Ok(text),
        other => Ok(text_form(&other)),
    }
}

fn interpolate_text(text: &str, context: &BindingContext<'_>, encode: bool) -> Result<Value, ResolveError> {
    if let Some(expression) = sole_expression(text) {
        let resolved = lookup_expression(expression, context)?;
        return Ok(match resolved {
            Value::String(value) if encode => Value::String(encode_path_segment(&value)),
            other if encode => Value::String(encode_path_segment(&text_form(&other))),
            other => other,
        });
    }

    let mut output = String::with_capacity(text.len());
    let mut remainder = text;
    while let Some(start) = remainder.find("${{") {
        let after_start = &remainder[start + 3..];
        let Some(end) = after_start.find("}}") else {
            break;
        };
        output.push_str(&remainder[..start]);
        let expression = after_start[..end].trim();
        let rendered = text_form(&lookup_expression(expression, context)?);
        if encode {
            output.push_str(&encode_path_segment(&rendered));
        } else {
            output.push_str(&rendered);
        }
        remainder = &after_start[end + 2..];
    }
    output.push_str(remainder);
    Ok(Value::String(output))
}

fn sole_expression(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("${{")?.strip_suffix("}}")?;
    if inner.contains("${{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

fn lookup_expression(expression: &str, context: &BindingContext<'_>) -> Result<Value, ResolveError> {
    if let Some(key) = expression.strip_prefix(FORM_PREFIX) {
        return context
            .form
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::binding(expression, format!("form value '{key}' is not set")));
    }

    if let Some(field_id) = expression.strip_prefix(FIELDS_PREFIX) {
        if !context.declared.iter().any(|declared| declared == field_id) {
            return Err(ResolveError::binding(expression, format!("field '{field_id}' is not a declared dependency")));
        }
        let options = context
            .resolved
            .get(field_id)
            .ok_or_else(|| ResolveError::binding(expression, format!("field '{field_id}' has not resolved")))?;
        return Ok(Value::Array(options.iter().map(|option| option.value.clone()).collect()));
    }

    Err(ResolveError::binding(expression, "expected a 'form.' or 'fields.' reference"))
}

fn text_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(text_form).collect::<Vec<_>>().join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn visit_strings(value: &Value, visit: &mut impl FnMut(&str)) {
    match value {
        Value::String(text) => visit(text),
        Value::Array(items) => items.iter().for_each(|item| visit_strings(item, visit)),
        Value::Object(map) => map.values().for_each(|nested| visit_strings(nested, visit)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("vendor".into(), json!("Cisco Systems"));
        values.insert("port".into(), json!(1812));
        values
    }

    #[test]
    fn sole_template_keeps_raw_json_type() {
        let form = form();
        let resolved = IndexMap::new();
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &[],
        };

        let bound = interpolate_value(&json!({ "port": "${{ form.port }}", "label": "port ${{ form.port }}" }), &context).expect("bound");
        assert_eq!(bound, json!({ "port": 1812, "label": "port 1812" }));
    }

    #[test]
    fn link_substitutions_are_path_encoded() {
        let form = form();
        let resolved = IndexMap::new();
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &[],
        };

        let source = ValueSource::link("/vendors/${{ form.vendor }}/models");
        let bound = bind_source(&source, &context).expect("bound");
        assert_eq!(bound, ValueSource::link("/vendors/Cisco%20Systems/models"));
    }

    #[test]
    fn field_reference_yields_option_values() {
        let form = Map::new();
        let mut resolved = IndexMap::new();
        resolved.insert("groups".to_string(), vec![SelectOption::new("g1", "G1"), SelectOption::new("g2", "G2")]);
        let declared = vec!["groups".to_string()];
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &declared,
        };

        let bound = bind_source(&ValueSource::api_call("members", json!({ "groups": "${{ fields.groups }}" })), &context).expect("bound");
        assert_eq!(bound, ValueSource::api_call("members", json!({ "groups": ["g1", "g2"] })));
    }

    #[test]
    fn undeclared_field_reference_is_a_binding_error() {
        let form = Map::new();
        let mut resolved = IndexMap::new();
        resolved.insert("groups".to_string(), vec![SelectOption::new("g1", "G1")]);
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &[],
        };

        let error = bind_source(&ValueSource::api_call("members", json!("${{ fields.groups }}")), &context).expect_err("undeclared");
        assert!(matches!(error, ResolveError::Binding { ref expression, .. } if expression == "fields.groups"));
    }

    #[test]
    fn missing_form_value_is_a_binding_error() {
        let form = Map::new();
        let resolved = IndexMap::new();
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &[],
        };

        let error = bind_source(&ValueSource::link("/x/${{ form.site }}"), &context).expect_err("missing");
        assert_eq!(error.kind(), "binding");
    }

    #[test]
    fn field_references_are_collected_once() {
        let source = ValueSource::page_api(
            "members",
            json!({ "a": "${{ fields.groups }}", "b": ["${{ fields.groups }}", "${{ fields.sites }}", "${{ form.x }}"] }),
        );
        assert_eq!(field_references(&source), vec!["groups".to_string(), "sites".to_string()]);
    }

    #[test]
    fn strings_without_templates_pass_through() {
        let form = Map::new();
        let resolved = IndexMap::new();
        let context = BindingContext {
            form: &form,
            resolved: &resolved,
            declared: &[],
        };
        let source = ValueSource::absolute_link("/ers/config/sgt?size=100");
        assert_eq!(bind_source(&source, &context).expect("bound"), source);
    }
}
