//! Field dependency planning.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use nac_types::{FieldId, FieldSpec};

use crate::{ResolveError, request::field_references};

/// Group fields into waves: every field's dependencies sit in earlier waves.
///
/// Fields keep their declaration order inside a wave. Dictionary fields never
/// wait on anything, so their `depends_on` is ignored.
///
/// # Errors
/// A [`ResolveError::Contract`] for unknown dependencies, self dependencies,
/// `${{ fields.<id> }}` references missing from `depends_on`, or cycles.
pub fn plan_waves(fields: &IndexMap<FieldId, FieldSpec>) -> Result<Vec<Vec<FieldId>>, ResolveError> {
    let mut in_degrees: HashMap<&str, usize> = fields.keys().map(|field_id| (field_id.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for (field_id, spec) in fields {
        if spec.source.is_dictionary() {
            continue;
        }
        if let Some(undeclared) = field_references(&spec.source)
            .into_iter()
            .find(|reference| !spec.depends_on.contains(reference))
        {
            return Err(ResolveError::contract(format!(
                "field '{field_id}' references field '{undeclared}' without declaring it in depends_on"
            )));
        }
        let mut seen = HashSet::new();
        for dependency in &spec.depends_on {
            if !fields.contains_key(dependency) {
                return Err(ResolveError::contract(format!("field '{field_id}' depends on unknown field '{dependency}'")));
            }
            if dependency == field_id {
                return Err(ResolveError::contract(format!("field '{field_id}' cannot depend on itself")));
            }
            if !seen.insert(dependency.as_str()) {
                continue;
            }
            if let Some(degree) = in_degrees.get_mut(field_id.as_str()) {
                *degree += 1;
            }
            dependents.entry(dependency.as_str()).or_default().push(field_id.as_str());
        }
    }

    let mut waves = Vec::new();
    let mut current: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|field_id| in_degrees.get(field_id).copied().unwrap_or(0) == 0)
        .collect();
    let mut planned = 0;

    while !current.is_empty() {
        planned += current.len();
        let mut next = Vec::new();
        for field_id in &current {
            for dependent in dependents.get(field_id).into_iter().flatten() {
                if let Some(degree) = in_degrees.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }
        next.sort_by_key(|field_id| fields.get_index_of(*field_id));
        waves.push(current.iter().map(|field_id| field_id.to_string()).collect());
        current = next;
    }

    if planned != fields.len() {
        let remaining: Vec<&str> = fields
            .keys()
            .map(String::as_str)
            .filter(|field_id| in_degrees.get(field_id).copied().unwrap_or(0) > 0)
            .collect();
        return Err(ResolveError::contract(format!(
            "cycle detected in field dependencies involving: {}",
            remaining.join(", ")
        )));
    }

    Ok(waves)
}
