//! Request specifications and the configuration they are built from.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verbs supported by the host transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether the verb changes server state and therefore needs the mutating header set.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete request produced by the request builder.
///
/// `url` is either a path relative to the host's base URL or an absolute URL.
/// `query` carries extra query pairs appended by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Logical REST resources the request builder knows how to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceName {
    /// Endpoint that generates option lists for links and API calls.
    Generate,
    /// Endpoint that returns dictionary entries for one or more types.
    DictionariesByType,
}

/// Path prefixes for each [`ResourceName`], supplied by host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasePaths {
    pub generate: String,
    pub dictionaries_by_type: String,
}

impl Default for BasePaths {
    fn default() -> Self {
        Self {
            generate: "/api/generate".into(),
            dictionaries_by_type: "/api/dictionaries/types".into(),
        }
    }
}

impl BasePaths {
    pub fn path(&self, resource: ResourceName) -> &str {
        match resource {
            ResourceName::Generate => &self.generate,
            ResourceName::DictionariesByType => &self.dictionaries_by_type,
        }
    }
}

/// The page hosting a form, used by page-bound descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    /// Current page path, for example `/admin/network-devices`.
    pub path: String,
    /// Query marker flagging an in-page AJAX call.
    #[serde(default = "default_ajax_marker")]
    pub ajax_marker: String,
}

impl PageContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ajax_marker: default_ajax_marker(),
        }
    }

    /// Page URL carrying the AJAX marker, appended with `?` or `&` as needed.
    pub fn ajax_url(&self) -> String {
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.path, separator, self.ajax_marker)
    }
}

fn default_ajax_marker() -> String {
    "ajax".into()
}
