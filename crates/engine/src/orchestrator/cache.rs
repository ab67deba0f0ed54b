//! Optional memoization around [`Orchestrator`].
//!
//! The orchestrator itself never caches. Callers that want to reuse options
//! across calls wrap it in a [`CachingOrchestrator`], which feeds fresh cache
//! hits back in as prefilled outcomes and stores only successful ones.
//!
//! A field's key covers its declaration, the form state, and the options of
//! the fields it depends on, so a dependent is only reused while its
//! upstream options are unchanged. The cache can be saved to and loaded from
//! a JSON file to carry entries across processes.

use std::{
    collections::HashMap,
    fs,
    hash::{DefaultHasher, Hash, Hasher},
    io,
    path::Path,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use nac_types::{FieldId, FieldSpec, FormContext, SelectOption};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FieldOutcome, Orchestrator, plan_waves};
use crate::ResolveError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    options: Vec<SelectOption>,
}

/// Time-bounded store of resolved option lists.
#[derive(Debug)]
pub struct OptionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    time_to_live: Duration,
}

impl OptionCache {
    pub fn new(time_to_live: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            time_to_live,
        }
    }

    /// Load a cache saved by [`OptionCache::save`].
    ///
    /// A missing, unreadable, or malformed file yields an empty cache. Stale
    /// entries are dropped on load.
    pub fn load(path: &Path, time_to_live: Duration) -> Self {
        let cache = Self::new(time_to_live);
        let entries: HashMap<String, CacheEntry> = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Failed to parse option cache; starting empty");
                    return cache;
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => return cache,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Failed to read option cache; starting empty");
                return cache;
            }
        };

        let now = Utc::now();
        let fresh: HashMap<String, CacheEntry> = entries.into_iter().filter(|(_, entry)| cache.is_fresh(entry, now)).collect();
        debug!(path = %path.display(), entries = fresh.len(), "loaded option cache");
        *cache.entries.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
        cache
    }

    /// Write the fresh entries to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let now = Utc::now();
        let fresh: HashMap<String, CacheEntry> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, entry)| self.is_fresh(entry, now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&fresh).map_err(io::Error::other)?;
        fs::write(path, content)
    }

    pub fn lookup_fresh(&self, key: &str) -> Option<Vec<SelectOption>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        self.is_fresh(entry, Utc::now()).then(|| entry.options.clone())
    }

    pub fn store(&self, key: String, options: Vec<SelectOption>) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(
            key,
            CacheEntry {
                stored_at: Utc::now(),
                options,
            },
        );
    }

    /// Drop every entry stored for `field_id`.
    pub fn invalidate_field(&self, field_id: &str) {
        let prefix = format!("{field_id}:");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries stamped in the future count as stale.
    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        (now - entry.stored_at).to_std().is_ok_and(|elapsed| elapsed < self.time_to_live)
    }
}

/// Cache key combining the field id with a hash of its declaration, the form
/// state, and the options of the fields it depends on.
pub fn cache_key(field_id: &str, spec: &FieldSpec, form: &FormContext, upstream: &[(&str, &[SelectOption])]) -> String {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(spec).unwrap_or_default().hash(&mut hasher);
    serde_json::to_string(form).unwrap_or_default().hash(&mut hasher);
    serde_json::to_string(upstream).unwrap_or_default().hash(&mut hasher);
    format!("{field_id}:{}", hasher.finish())
}

/// Options of every dependency of `spec`, in `depends_on` order, or `None`
/// when one of them is not in `known`. Dictionary fields have no upstream.
fn upstream_options<'a>(spec: &'a FieldSpec, known: &'a IndexMap<FieldId, Vec<SelectOption>>) -> Option<Vec<(&'a str, &'a [SelectOption])>> {
    if spec.source.is_dictionary() {
        return Some(Vec::new());
    }
    spec.depends_on
        .iter()
        .map(|dependency| known.get(dependency).map(|options| (dependency.as_str(), options.as_slice())))
        .collect()
}

/// An [`Orchestrator`] with a TTL option cache in front of it.
#[derive(Debug)]
pub struct CachingOrchestrator {
    inner: Orchestrator,
    cache: OptionCache,
}

impl CachingOrchestrator {
    pub fn new(inner: Orchestrator, time_to_live: Duration) -> Self {
        Self::with_cache(inner, OptionCache::new(time_to_live))
    }

    pub fn with_cache(inner: Orchestrator, cache: OptionCache) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &Orchestrator {
        &self.inner
    }

    pub fn cache(&self) -> &OptionCache {
        &self.cache
    }

    /// Resolve like [`Orchestrator::resolve_all`], serving fresh entries from the cache.
    ///
    /// Lookups walk the dependency waves, so a dependent field is only looked
    /// up once every field it depends on was itself a hit. A field whose
    /// upstream is fetched again is fetched again too.
    pub async fn resolve_all(
        &self,
        fields: &IndexMap<FieldId, FieldSpec>,
        form: &FormContext,
    ) -> Result<IndexMap<FieldId, FieldOutcome>, ResolveError> {
        let waves = plan_waves(fields)?;

        let mut hits: IndexMap<FieldId, Vec<SelectOption>> = IndexMap::new();
        for field_id in waves.iter().flatten() {
            let Some(spec) = fields.get(field_id) else {
                continue;
            };
            let Some(upstream) = upstream_options(spec, &hits) else {
                continue;
            };
            let key = cache_key(field_id, spec, form, &upstream);
            if let Some(options) = self.cache.lookup_fresh(&key) {
                hits.insert(field_id.clone(), options);
            }
        }
        debug!(field_count = fields.len(), cache_hits = hits.len(), "option cache consulted");

        let prefilled: IndexMap<FieldId, FieldOutcome> = hits.iter().map(|(field_id, options)| (field_id.clone(), Ok(options.clone()))).collect();
        let outcomes = self.inner.resolve_all_with_prefilled(fields, form, prefilled).await?;

        let resolved: IndexMap<FieldId, Vec<SelectOption>> = outcomes
            .iter()
            .filter_map(|(field_id, outcome)| outcome.as_ref().ok().map(|options| (field_id.clone(), options.clone())))
            .collect();
        for (field_id, options) in &resolved {
            if hits.contains_key(field_id) {
                continue;
            }
            let Some(spec) = fields.get(field_id) else {
                continue;
            };
            if let Some(upstream) = upstream_options(spec, &resolved) {
                self.cache.store(cache_key(field_id, spec, form, &upstream), options.clone());
            }
        }
        Ok(outcomes)
    }
}
