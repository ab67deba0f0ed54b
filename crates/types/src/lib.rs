//! Shared data model for value-source resolution.
//!
//! Every type in this crate is plain data: descriptors declaring where a
//! field's options come from, result mappings, normalized options, request
//! specifications, and the configuration values the request builder reads.

pub mod descriptor;
pub mod dictionary;
pub mod form;
pub mod mapping;
pub mod request;

pub use descriptor::{ApiCallDescriptor, DescriptorError, DictionaryDescriptor, LinkDescriptor, PageDescriptor, ValueSource};
pub use dictionary::{CombinedDictionary, DictionaryEntry};
pub use form::{FieldId, FieldSpec, FormContext, FormDocument};
pub use mapping::{FieldMapping, ResultMapping, SelectOption};
pub use request::{BasePaths, HttpMethod, PageContext, RequestSpec, ResourceName};
