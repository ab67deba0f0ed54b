//! Dictionary Combiner.
//!
//! Static dictionaries are fetched for several types in one round trip and
//! kept as a lookup table keyed by type.

use indexmap::{IndexMap, IndexSet};
use nac_types::{BasePaths, CombinedDictionary, DictionaryEntry, FieldMapping, SelectOption};
use serde_json::Value;
use tracing::debug;

use crate::{ResolveError, Resolver, normalize::normalize_entries, request::build_dictionary_request};

/// Loads combined dictionary tables through a [`Resolver`].
#[derive(Debug)]
pub struct DictionaryCombiner<'a> {
    resolver: &'a Resolver,
    paths: &'a BasePaths,
}

impl<'a> DictionaryCombiner<'a> {
    pub fn new(resolver: &'a Resolver, paths: &'a BasePaths) -> Self {
        Self { resolver, paths }
    }

    /// Fetch entries for every requested type with a single request.
    ///
    /// Duplicate types are requested once. Types the backend does not know
    /// are absent from the result. An empty request list performs no I/O.
    pub async fn load_combined(&self, types: &[String]) -> Result<CombinedDictionary, ResolveError> {
        let requested = dedup_types(types);
        if requested.is_empty() {
            return Ok(CombinedDictionary::new());
        }

        let spec = build_dictionary_request(&requested, self.paths);
        let response = self.resolver.resolve(&spec).await?;
        let table = combine_response(response, &requested)?;
        debug!(
            requested = requested.len(),
            returned = table.len(),
            "combined dictionary loaded"
        );
        Ok(table)
    }
}

/// Requested types without duplicates, in first-seen order.
pub fn dedup_types(types: &[String]) -> Vec<String> {
    types.iter().cloned().collect::<IndexSet<_>>().into_iter().collect()
}

/// Shape a combined dictionary response into a table restricted to `requested`.
///
/// Accepts an object keyed by type, or an array of entries grouped by their
/// `type`. Entries under an object key that carry no `type` inherit the key.
pub fn combine_response(response: Value, requested: &[String]) -> Result<CombinedDictionary, ResolveError> {
    let mut grouped: IndexMap<String, Vec<DictionaryEntry>> = IndexMap::new();
    match response {
        Value::Object(by_type) => {
            for (dictionary_type, entries) in by_type {
                let Value::Array(entries) = entries else {
                    return Err(ResolveError::shape(format!("dictionary type '{dictionary_type}' is not an array")));
                };
                let bucket = grouped.entry(dictionary_type.clone()).or_default();
                for entry in entries {
                    bucket.push(parse_entry(with_type(entry, &dictionary_type))?);
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let entry = parse_entry(entry)?;
                grouped.entry(entry.r#type.clone()).or_default().push(entry);
            }
        }
        Value::Null => {}
        other => {
            return Err(ResolveError::shape(format!("combined dictionary response must be an object or array, got {other}")));
        }
    }

    Ok(requested
        .iter()
        .filter_map(|dictionary_type| grouped.shift_remove_entry(dictionary_type))
        .collect())
}

/// Options for one dictionary type; an absent type yields no options.
pub fn dictionary_options(
    table: &CombinedDictionary,
    dictionary_type: &str,
    fields: &FieldMapping,
) -> Result<Vec<SelectOption>, ResolveError> {
    let Some(entries) = table.get(dictionary_type) else {
        return Ok(Vec::new());
    };
    let values = entries
        .iter()
        .map(|entry| serde_json::to_value(entry).map_err(|error| ResolveError::shape(error.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    normalize_entries(&values, fields)
}

fn with_type(mut entry: Value, dictionary_type: &str) -> Value {
    if let Value::Object(map) = &mut entry
        && !map.contains_key("type")
    {
        map.insert("type".into(), Value::String(dictionary_type.to_string()));
    }
    entry
}

fn parse_entry(entry: Value) -> Result<DictionaryEntry, ResolveError> {
    serde_json::from_value(entry).map_err(|error| ResolveError::shape(format!("malformed dictionary entry: {error}")))
}
