//! Transport abstraction over the host HTTP client.

use async_trait::async_trait;
use nac_types::HttpMethod;
use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;

/// A fully specified outgoing call.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    /// Path relative to the host's base URL, or an absolute URL.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// JSON body, sent only for mutating verbs.
    pub body: Option<Value>,
}

/// Status and raw body of a completed call, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The call never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request could not be built: {0}")]
    Build(String),
}

/// HTTP capability supplied by the host application.
///
/// Implementations perform exactly one round trip per call and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
