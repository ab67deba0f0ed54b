//! Session header provider.
//!
//! Read calls (GET) and mutating calls (POST/PUT/DELETE) carry different
//! header sets: only the mutating set includes the CSRF token and a JSON
//! content type.

use std::env;

use nac_types::HttpMethod;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::config::ConfigError;

/// Environment variable holding the session bearer token.
pub const TOKEN_ENV: &str = "NAC_CONSOLE_TOKEN";
/// Environment variable holding the CSRF token for mutating calls.
pub const CSRF_TOKEN_ENV: &str = "NAC_CONSOLE_CSRF_TOKEN";

const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");

/// Supplies the header sets attached to outgoing calls.
pub trait SessionHeaderProvider: Send + Sync {
    /// Headers for read calls.
    fn read_headers(&self) -> HeaderMap;

    /// Headers for mutating calls.
    fn update_headers(&self) -> HeaderMap;

    /// Header set matching the verb.
    fn headers_for(&self, method: HttpMethod) -> HeaderMap {
        if method.is_mutating() {
            self.update_headers()
        } else {
            self.read_headers()
        }
    }
}

/// Fixed header sets built once from tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionHeaders {
    read: HeaderMap,
    update: HeaderMap,
}

impl StaticSessionHeaders {
    /// Build header sets from an optional bearer token and an optional CSRF token.
    pub fn new(token: Option<&str>, csrf_token: Option<&str>) -> Result<Self, ConfigError> {
        let mut read = HeaderMap::new();
        read.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|error| ConfigError::InvalidHeader {
                header: "authorization",
                reason: error.to_string(),
            })?;
            read.insert(header::AUTHORIZATION, value);
        }

        let mut update = read.clone();
        update.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(csrf_token) = csrf_token.map(str::trim).filter(|token| !token.is_empty()) {
            let value = HeaderValue::from_str(csrf_token).map_err(|error| ConfigError::InvalidHeader {
                header: "x-csrf-token",
                reason: error.to_string(),
            })?;
            update.insert(CSRF_HEADER, value);
        }

        Ok(Self { read, update })
    }

    /// Build header sets from `NAC_CONSOLE_TOKEN` and `NAC_CONSOLE_CSRF_TOKEN`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = env::var(TOKEN_ENV).ok();
        let csrf_token = env::var(CSRF_TOKEN_ENV).ok();
        Self::new(token.as_deref(), csrf_token.as_deref())
    }
}

impl SessionHeaderProvider for StaticSessionHeaders {
    fn read_headers(&self) -> HeaderMap {
        self.read.clone()
    }

    fn update_headers(&self) -> HeaderMap {
        self.update.clone()
    }
}
