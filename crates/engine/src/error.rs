//! Resolution error taxonomy.

use nac_types::DescriptorError;
use serde_json::{Value, json};
use thiserror::Error;

/// Why a field, or a whole resolution call, failed.
///
/// `Contract` is the only kind that fails an entire `resolve_all` call; every
/// other kind is captured per field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// The response did not match the declared result mapping.
    #[error("response did not match the declared mapping: {reason}")]
    Shape { reason: String },

    /// Non-2xx status, or no response at all (`status` is `None`).
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
        /// Structured error payload attached by the backend, when JSON.
        detail: Option<Value>,
    },

    /// The caller declared something no request can be built from.
    #[error("descriptor contract violated: {reason}")]
    Contract { reason: String },

    /// A `${{ ... }}` reference could not be resolved for this field.
    #[error("unresolved binding '{expression}': {reason}")]
    Binding { expression: String, reason: String },

    /// A field this one depends on failed, so it was never dispatched.
    #[error("dependency '{dependency}' failed: {reason}")]
    Dependency { dependency: String, reason: String },
}

impl ResolveError {
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape { reason: reason.into() }
    }

    pub fn contract(reason: impl Into<String>) -> Self {
        Self::Contract { reason: reason.into() }
    }

    pub fn binding(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Binding {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Stable kind name for renderers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::Shape { .. } => "shape",
            ResolveError::Transport { .. } => "transport",
            ResolveError::Contract { .. } => "contract",
            ResolveError::Binding { .. } => "binding",
            ResolveError::Dependency { .. } => "dependency",
        }
    }

    /// JSON rendering handed to the form layer.
    pub fn to_json(&self) -> Value {
        let mut rendered = json!({ "kind": self.kind(), "message": self.to_string() });
        if let ResolveError::Transport { status, detail, .. } = self {
            rendered["status"] = json!(status);
            if let Some(detail) = detail {
                rendered["detail"] = detail.clone();
            }
        }
        rendered
    }
}

impl From<DescriptorError> for ResolveError {
    fn from(error: DescriptorError) -> Self {
        ResolveError::contract(error.to_string())
    }
}
