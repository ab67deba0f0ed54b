//! Resolution Orchestrator.
//!
//! `resolve_all` runs one bind → build → resolve → normalize pipeline per
//! field and returns a per-field outcome. Only contract violations fail the
//! whole call.
//!
//! Phases:
//! - contract checks and dependency planning ([`plan_waves`])
//! - one combined dictionary load for every dictionary field
//! - dependency waves, each wave dispatched concurrently on the caller's task

mod cache;
mod planning;

use std::time::Instant;

use futures_util::future::join_all;
use indexmap::IndexMap;
use nac_types::{BasePaths, FieldId, FieldSpec, FormContext, RequestSpec, SelectOption};
use tracing::{debug, info, warn};

pub use cache::{CachingOrchestrator, OptionCache, cache_key};
pub use planning::plan_waves;

use crate::{
    ResolveError, Resolver,
    dictionary::{DictionaryCombiner, dedup_types, dictionary_options},
    normalize::normalize,
    request::{BindingContext, bind_source, build_dictionary_request, build_request},
};

/// Options for a field, or the reason it has none.
pub type FieldOutcome = Result<Vec<SelectOption>, ResolveError>;

/// Dictionary keys a dictionary field's mapping may name.
const DICTIONARY_ENTRY_KEYS: &[&str] = &["id", "name", "type"];

/// One request serving several fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedRequest {
    pub field_ids: Vec<FieldId>,
    pub request: RequestSpec,
}

/// Requests a `resolve_all` call would send.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequests {
    /// The combined dictionary request, when any field is a dictionary field.
    pub dictionary: Option<SharedRequest>,
    /// Requests of the remaining fields, in declaration order.
    pub fields: IndexMap<FieldId, Result<RequestSpec, ResolveError>>,
}

/// Drives resolution of every field of a form.
#[derive(Debug)]
pub struct Orchestrator {
    resolver: Resolver,
    paths: BasePaths,
}

impl Orchestrator {
    pub fn new(resolver: Resolver, paths: BasePaths) -> Self {
        Self { resolver, paths }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn paths(&self) -> &BasePaths {
        &self.paths
    }

    pub fn dictionaries(&self) -> DictionaryCombiner<'_> {
        DictionaryCombiner::new(&self.resolver, &self.paths)
    }

    /// Build the requests `resolve_all` would send, without sending anything.
    ///
    /// Dictionary fields share one combined request, reported once. Other
    /// fields get their own request; `fields.<id>` bindings cannot be
    /// satisfied without resolving, so such fields report a binding error.
    pub fn build_requests(&self, fields: &IndexMap<FieldId, FieldSpec>, form: &FormContext) -> Result<PlannedRequests, ResolveError> {
        check_contract(fields, form)?;

        let dictionary_fields: Vec<(&FieldId, &str)> = fields
            .iter()
            .filter_map(|(field_id, spec)| spec.source.dictionary_type().map(|dictionary_type| (field_id, dictionary_type)))
            .collect();
        let dictionary = (!dictionary_fields.is_empty()).then(|| {
            let types: Vec<String> = dictionary_fields.iter().map(|(_, dictionary_type)| dictionary_type.to_string()).collect();
            SharedRequest {
                field_ids: dictionary_fields.iter().map(|(field_id, _)| (*field_id).clone()).collect(),
                request: build_dictionary_request(&dedup_types(&types), &self.paths),
            }
        });

        let resolved = IndexMap::new();
        let requests = fields
            .iter()
            .filter(|(_, spec)| !spec.source.is_dictionary())
            .map(|(field_id, spec)| {
                let context = BindingContext {
                    form: &form.values,
                    resolved: &resolved,
                    declared: &spec.depends_on,
                };
                let request = bind_source(&spec.source, &context)
                    .and_then(|bound| build_request(&bound, &self.paths, form.page.as_ref()));
                (field_id.clone(), request)
            })
            .collect();

        Ok(PlannedRequests {
            dictionary,
            fields: requests,
        })
    }

    /// Resolve every field. Output keys follow the input order.
    ///
    /// # Errors
    /// A [`ResolveError::Contract`] when the dependency graph is invalid, a
    /// page-bound field has no page context, or a dictionary field maps keys
    /// dictionary entries do not carry. Every other failure is returned as
    /// that field's outcome.
    pub async fn resolve_all(
        &self,
        fields: &IndexMap<FieldId, FieldSpec>,
        form: &FormContext,
    ) -> Result<IndexMap<FieldId, FieldOutcome>, ResolveError> {
        self.resolve_all_with_prefilled(fields, form, IndexMap::new()).await
    }

    /// Like [`Orchestrator::resolve_all`], but fields present in `prefilled`
    /// are not dispatched; their outcomes are visible to dependents as is.
    pub async fn resolve_all_with_prefilled(
        &self,
        fields: &IndexMap<FieldId, FieldSpec>,
        form: &FormContext,
        prefilled: IndexMap<FieldId, FieldOutcome>,
    ) -> Result<IndexMap<FieldId, FieldOutcome>, ResolveError> {
        let start = Instant::now();
        let waves = check_contract(fields, form)?;
        let mut outcomes: IndexMap<FieldId, FieldOutcome> =
            prefilled.into_iter().filter(|(field_id, _)| fields.contains_key(field_id)).collect();

        self.resolve_dictionaries(fields, &mut outcomes).await;

        for (wave_index, wave) in waves.iter().enumerate() {
            let resolved: IndexMap<FieldId, Vec<SelectOption>> = outcomes
                .iter()
                .filter_map(|(field_id, outcome)| outcome.as_ref().ok().map(|options| (field_id.clone(), options.clone())))
                .collect();

            let mut pending = Vec::new();
            for field_id in wave {
                if outcomes.contains_key(field_id) {
                    continue;
                }
                let Some(spec) = fields.get(field_id) else {
                    continue;
                };
                if let Some(error) = failed_dependency(spec, &outcomes) {
                    debug!(field_id = %field_id, reason = %error, "field skipped after dependency failure");
                    outcomes.insert(field_id.clone(), Err(error));
                    continue;
                }
                pending.push((field_id, spec));
            }

            if pending.is_empty() {
                continue;
            }
            debug!(wave = wave_index, field_count = pending.len(), "dispatching resolution wave");
            let results = join_all(
                pending
                    .iter()
                    .map(|(field_id, spec)| self.resolve_field(field_id, spec, form, &resolved)),
            )
            .await;
            for ((field_id, _), outcome) in pending.into_iter().zip(results) {
                outcomes.insert(field_id.clone(), outcome);
            }
        }

        let failed = outcomes.values().filter(|outcome| outcome.is_err()).count();
        info!(
            field_count = fields.len(),
            failed,
            duration_ms = start.elapsed().as_millis(),
            "form resolution completed"
        );

        Ok(fields
            .keys()
            .filter_map(|field_id| outcomes.shift_remove(field_id).map(|outcome| (field_id.clone(), outcome)))
            .collect())
    }

    async fn resolve_dictionaries(&self, fields: &IndexMap<FieldId, FieldSpec>, outcomes: &mut IndexMap<FieldId, FieldOutcome>) {
        let dictionary_fields: Vec<(&FieldId, &FieldSpec, &str)> = fields
            .iter()
            .filter(|(field_id, _)| !outcomes.contains_key(*field_id))
            .filter_map(|(field_id, spec)| spec.source.dictionary_type().map(|dictionary_type| (field_id, spec, dictionary_type)))
            .collect();
        if dictionary_fields.is_empty() {
            return;
        }

        let types: Vec<String> = dictionary_fields.iter().map(|(_, _, dictionary_type)| dictionary_type.to_string()).collect();
        let table = self.dictionaries().load_combined(&types).await;
        for (field_id, spec, dictionary_type) in dictionary_fields {
            let outcome = match &table {
                Ok(table) => dictionary_options(table, dictionary_type, &spec.mapping.fields),
                Err(error) => Err(error.clone()),
            };
            log_outcome(field_id, &outcome);
            outcomes.insert(field_id.clone(), outcome);
        }
    }

    async fn resolve_field(
        &self,
        field_id: &str,
        spec: &FieldSpec,
        form: &FormContext,
        resolved: &IndexMap<FieldId, Vec<SelectOption>>,
    ) -> FieldOutcome {
        let start = Instant::now();
        debug!(field_id = %field_id, source = spec.source.kind(), "field resolution started");
        let outcome = self.run_pipeline(spec, form, resolved).await;
        debug!(field_id = %field_id, duration_ms = start.elapsed().as_millis(), "field resolution finished");
        log_outcome(field_id, &outcome);
        outcome
    }

    async fn run_pipeline(
        &self,
        spec: &FieldSpec,
        form: &FormContext,
        resolved: &IndexMap<FieldId, Vec<SelectOption>>,
    ) -> FieldOutcome {
        let context = BindingContext {
            form: &form.values,
            resolved,
            declared: &spec.depends_on,
        };
        let bound = bind_source(&spec.source, &context)?;
        let request = build_request(&bound, &self.paths, form.page.as_ref())?;
        let response = self.resolver.resolve(&request).await?;
        normalize(&response, &spec.mapping)
    }
}

fn check_contract(fields: &IndexMap<FieldId, FieldSpec>, form: &FormContext) -> Result<Vec<Vec<FieldId>>, ResolveError> {
    if form.page.is_none()
        && let Some((field_id, _)) = fields.iter().find(|(_, spec)| spec.source.requires_page_context())
    {
        return Err(ResolveError::contract(format!("field '{field_id}' is page-bound but no page context was given")));
    }
    for (field_id, spec) in fields.iter().filter(|(_, spec)| spec.source.is_dictionary()) {
        let mapping = &spec.mapping.fields;
        if let Some(key) = [&mapping.id, &mapping.name]
            .into_iter()
            .find(|key| !DICTIONARY_ENTRY_KEYS.contains(&key.as_str()))
        {
            return Err(ResolveError::contract(format!(
                "dictionary field '{field_id}' maps key '{key}'; dictionary entries only carry id, name and type"
            )));
        }
    }
    plan_waves(fields)
}

fn failed_dependency(spec: &FieldSpec, outcomes: &IndexMap<FieldId, FieldOutcome>) -> Option<ResolveError> {
    if spec.source.is_dictionary() {
        return None;
    }
    spec.depends_on.iter().find_map(|dependency| match outcomes.get(dependency) {
        Some(Err(error)) => Some(ResolveError::Dependency {
            dependency: dependency.clone(),
            reason: error.to_string(),
        }),
        _ => None,
    })
}

fn log_outcome(field_id: &str, outcome: &FieldOutcome) {
    match outcome {
        Ok(options) => debug!(field_id = %field_id, option_count = options.len(), "field resolved"),
        Err(error) => warn!(field_id = %field_id, kind = error.kind(), error = %error, "field resolution failed"),
    }
}
