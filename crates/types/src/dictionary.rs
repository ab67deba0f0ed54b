//! Dictionary entries returned by combined dictionary lookups.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One `{ id, name, type }` triple of a static dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: Value,
    pub name: String,
    /// Dictionary type; numeric types are carried as their decimal text.
    #[serde(rename = "type", deserialize_with = "string_or_number")]
    pub r#type: String,
}

/// Entries for several dictionary types, keyed by type in request order.
pub type CombinedDictionary = IndexMap<String, Vec<DictionaryEntry>>;

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!("dictionary type must be a string or number, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_type_deserializes_as_text() {
        let entry: DictionaryEntry = serde_json::from_value(json!({ "id": 4, "name": "Cisco", "type": 2 })).expect("entry");
        assert_eq!(entry.r#type, "2");
        assert_eq!(entry.id, json!(4));
    }

    #[test]
    fn boolean_type_is_rejected() {
        let result = serde_json::from_value::<DictionaryEntry>(json!({ "id": 4, "name": "Cisco", "type": true }));
        assert!(result.is_err());
    }
}
