//! Resolver: executes a built request against the host transport.
//!
//! Each call is a single round trip. GET requests carry a cache-defeat query
//! value so intermediate caches never answer them, and the header set follows
//! the verb (read set for GET, mutating set otherwise).

use std::{sync::Arc, time::Instant};

use nac_api::{SessionHeaderProvider, Transport, TransportRequest};
use nac_types::{HttpMethod, RequestSpec};
use nac_util::{CacheBuster, parse_error_detail, parse_response_json_strict, redact_sensitive, status_error_message};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ResolveError;

/// Default query parameter name for the cache-defeat value.
pub const DEFAULT_CACHE_DEFEAT_PARAM: &str = "_";

/// Sends requests and returns their raw JSON payloads.
pub struct Resolver {
    transport: Arc<dyn Transport>,
    headers: Arc<dyn SessionHeaderProvider>,
    cache_buster: CacheBuster,
    cache_defeat_param: String,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("cache_defeat_param", &self.cache_defeat_param)
            .finish()
    }
}

impl Resolver {
    pub fn new(transport: Arc<dyn Transport>, headers: Arc<dyn SessionHeaderProvider>) -> Self {
        Self {
            transport,
            headers,
            cache_buster: CacheBuster::new(),
            cache_defeat_param: DEFAULT_CACHE_DEFEAT_PARAM.to_string(),
        }
    }

    pub fn with_cache_defeat_param(mut self, param: impl Into<String>) -> Self {
        self.cache_defeat_param = param.into();
        self
    }

    /// Turn a request spec into the outgoing call: headers for the verb, and a
    /// fresh cache-defeat value on GET.
    pub fn prepare(&self, spec: &RequestSpec) -> TransportRequest {
        let mut query = spec.query.clone();
        if spec.method == HttpMethod::Get {
            query.push((self.cache_defeat_param.clone(), self.cache_buster.next_value().to_string()));
        }

        TransportRequest {
            method: spec.method,
            url: spec.url.clone(),
            query,
            headers: self.headers.headers_for(spec.method),
            body: if spec.method.is_mutating() { spec.body.clone() } else { None },
        }
    }

    /// Perform the request and parse the response body as JSON.
    ///
    /// An empty 2xx body resolves to `null`.
    ///
    /// # Errors
    /// - [`ResolveError::Transport`] for a non-2xx status (with the parsed error
    ///   payload as `detail`) or when no response arrived (`status` is `None`)
    /// - [`ResolveError::Shape`] for a 2xx body that is not JSON
    pub async fn resolve(&self, spec: &RequestSpec) -> Result<Value, ResolveError> {
        let start = Instant::now();
        let request = self.prepare(spec);
        debug!(
            method = %request.method,
            url = %request.url,
            query_parameter_count = request.query.len(),
            has_body = request.body.is_some(),
            "resolution request started"
        );

        let response = self.transport.execute(request).await.map_err(|error| {
            warn!(
                method = %spec.method,
                url = %spec.url,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "resolution request failed"
            );
            ResolveError::Transport {
                status: None,
                message: error.to_string(),
                detail: None,
            }
        })?;

        if !response.is_success() {
            warn!(
                method = %spec.method,
                url = %spec.url,
                status = response.status,
                body = %redact_sensitive(&response.body),
                duration_ms = start.elapsed().as_millis(),
                "resolution request returned an error status"
            );
            let message = status_error_message(response.status).unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(ResolveError::Transport {
                status: Some(response.status),
                message,
                detail: parse_error_detail(&response.body),
            });
        }

        if response.body.trim().is_empty() {
            debug!(
                method = %spec.method,
                url = %spec.url,
                status = response.status,
                duration_ms = start.elapsed().as_millis(),
                "resolution request completed with empty response"
            );
            return Ok(Value::Null);
        }

        let parsed = parse_response_json_strict(&response.body, Some(response.status)).map_err(|error| {
            warn!(
                method = %spec.method,
                url = %spec.url,
                status = response.status,
                body_len = response.body.len(),
                error = %redact_sensitive(&error.to_string()),
                "resolution response JSON parse failed"
            );
            ResolveError::shape(error.to_string())
        })?;
        debug!(
            method = %spec.method,
            url = %spec.url,
            status = response.status,
            duration_ms = start.elapsed().as_millis(),
            "resolution request completed"
        );
        Ok(parsed)
    }
}
