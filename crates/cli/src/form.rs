//! Form document loading and `--set` overrides.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use nac_types::FormDocument;
use serde_json::Value;

/// Load a form document: `.json` files as JSON, anything else as YAML.
pub fn load_form(path: &Path) -> Result<FormDocument> {
    let content = fs::read_to_string(path).with_context(|| format!("read form document {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).with_context(|| format!("parse JSON form document {}", path.display()))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parse YAML form document {}", path.display()))
    }
}

/// Parse `key=value`; the value is taken as JSON when it parses, else as text.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = assignment.split_once('=') else {
        bail!("expected key=value, got '{assignment}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty key in '{assignment}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignments_prefer_json_values() {
        assert_eq!(parse_assignment("port=1812").unwrap(), ("port".into(), json!(1812)));
        assert_eq!(parse_assignment("site=HQ West").unwrap(), ("site".into(), json!("HQ West")));
        assert_eq!(parse_assignment("tags=[\"a\"]").unwrap(), ("tags".into(), json!(["a"])));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn yaml_and_json_documents_load() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("device.yaml");
        fs::write(
            &yaml_path,
            "fields:\n  vendor:\n    source: { dictionary: 2 }\n  models:\n    source: { link: \"/models/${{ form.vendor }}\" }\n    mapping: { attribute: models }\nvalues:\n  vendor: cisco\n",
        )
        .unwrap();
        let json_path = dir.path().join("device.json");
        fs::write(&json_path, r#"{ "fields": { "groups": { "source": { "call": "groups" } } } }"#).unwrap();

        let yaml = load_form(&yaml_path).unwrap();
        assert_eq!(yaml.fields.keys().collect::<Vec<_>>(), vec!["vendor", "models"]);
        assert_eq!(yaml.fields["models"].mapping.attribute, "models");
        assert_eq!(yaml.values["vendor"], json!("cisco"));

        let json = load_form(&json_path).unwrap();
        assert_eq!(json.fields["groups"].source.kind(), "api_call");
    }

    #[test]
    fn malformed_descriptor_fails_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{ "fields": { "groups": { "source": { "link": "/a", "call": "b" } } } }"#).unwrap();
        assert!(load_form(&path).is_err());
    }
}
