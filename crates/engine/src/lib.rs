//! # NAC Console Engine
//!
//! Resolves the selectable values of form fields from declarative
//! descriptors ([`ValueSource`]) instead of per-field code.
//!
//! ## Key Features
//!
//! - **Request Builder**: pure mapping from a descriptor to a [`RequestSpec`]
//! - **Resolver**: one round trip per request, cache-defeat values on GET
//! - **Result Normalizer**: strict `{ value, label }` extraction
//! - **Dictionary Combiner**: several static dictionaries in one request
//! - **Orchestrator**: per-field outcomes with fault isolation, dependency
//!   waves and `${{ form.x }}` / `${{ fields.id }}` bindings
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use nac_api::{ConsoleClient, ConsoleConfig, StaticSessionHeaders};
//! use nac_engine::{Orchestrator, Resolver};
//!
//! let config = ConsoleConfig::load()?;
//! let resolver = Resolver::new(Arc::new(ConsoleClient::new(&config)?), Arc::new(StaticSessionHeaders::from_env()?));
//! let orchestrator = Orchestrator::new(resolver, config.paths.clone());
//! let outcomes = orchestrator.resolve_all(&document.fields, &document.context()).await?;
//! ```
//!
//! ## Architecture
//!
//! - **`request`**: binding substitution and the request builder
//! - **`resolver`**: transport round trips and response parsing
//! - **`normalize`**: response to option mapping
//! - **`dictionary`**: combined dictionary lookups
//! - **`orchestrator`**: planning, concurrent dispatch and the option cache

pub mod dictionary;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod request;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use dictionary::{DictionaryCombiner, combine_response, dictionary_options};
pub use error::ResolveError;
pub use normalize::{normalize, normalize_entries};
pub use orchestrator::{CachingOrchestrator, FieldOutcome, OptionCache, Orchestrator, PlannedRequests, SharedRequest, plan_waves};
pub use request::{BindingContext, bind_source, build_dictionary_request, build_request};
pub use resolver::{DEFAULT_CACHE_DEFEAT_PARAM, Resolver};

pub use nac_types::{FieldId, FieldSpec, FormContext, RequestSpec, SelectOption, ValueSource};
