//! Request construction: binding substitution followed by the pure request builder.

mod bindings;
mod builder;

pub use bindings::{BindingContext, bind_source, field_references, interpolate_value};
pub use builder::{build_dictionary_request, build_request};
