//! Console configuration loading.
//!
//! Configuration is a small JSON file (`~/.config/nac-console/config.json` on
//! most platforms, overridable through `NAC_CONSOLE_CONFIG_PATH`). A missing
//! or unreadable file yields defaults; `NAC_CONSOLE_BASE_URL` overrides the
//! base URL from the file.
//!
//! Resolved options are cached in `nac-console/options.json` under the
//! platform cache directory, overridable through
//! `NAC_CONSOLE_OPTION_CACHE_PATH`.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use dirs_next::{cache_dir, config_dir};
use nac_types::BasePaths;
use nac_util::expand_tilde;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "NAC_CONSOLE_CONFIG_PATH";
/// Environment variable overriding the configured base URL.
pub const BASE_URL_ENV: &str = "NAC_CONSOLE_BASE_URL";
/// Environment variable overriding the option cache file location.
pub const OPTION_CACHE_PATH_ENV: &str = "NAC_CONSOLE_OPTION_CACHE_PATH";

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Errors surfaced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid header value for {header}: {reason}")]
    InvalidHeader { header: &'static str, reason: String },
}

/// Host configuration consumed by the client and the request builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Scheme and host of the console, for example `https://nac.example.com`.
    pub base_url: String,
    /// Path prefixes of the logical resources.
    pub paths: BasePaths,
    pub timeout_secs: u64,
    /// Query parameter carrying the cache-defeat value on GET requests.
    pub cache_defeat_param: String,
    /// Lifetime of memoized option lists when the option cache is enabled.
    pub option_cache_ttl_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            paths: BasePaths::default(),
            timeout_secs: 30,
            cache_defeat_param: "_".into(),
            option_cache_ttl_secs: 30,
        }
    }
}

impl ConsoleConfig {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&default_config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path without environment overrides or validation.
    ///
    /// A missing file yields defaults; a file that is not valid configuration
    /// is logged and also yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded console configuration");
                    Ok(config)
                }
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse console configuration; using defaults"
                    );
                    Ok(Self::default())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(ConfigError::Io(error)),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = env::var(BASE_URL_ENV)
            && !base_url.trim().is_empty()
        {
            self.base_url = base_url.trim().to_string();
        }
    }

    /// Validate the base URL.
    ///
    /// Rules:
    /// - `localhost` or `127.0.0.1`: any scheme is allowed
    /// - otherwise: the scheme must be HTTPS
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn option_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.option_cache_ttl_secs)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Default path of the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nac-console")
        .join("config.json")
}

/// Default path of the option cache file.
pub fn default_option_cache_path() -> PathBuf {
    if let Ok(path) = env::var(OPTION_CACHE_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    cache_dir()
        .or_else(config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nac-console")
        .join("options.json")
}

fn validate_base_url(base: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };

    let parsed = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
    let host_name = parsed.host_str().ok_or_else(|| invalid("a host is required".into()))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(invalid(format!("non-localhost hosts must use https; got '{}://'", parsed.scheme())));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = ConsoleConfig::load_from(&temp_dir.path().join("absent.json")).expect("config");
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        let config = ConsoleConfig::load_from(&path).expect("config");
        assert_eq!(config, ConsoleConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "base_url": "https://nac.example.com", "paths": { "generate": "/admin/API/generate" } }"#,
        )
        .expect("write");

        let config = ConsoleConfig::load_from(&path).expect("config");
        assert_eq!(config.base_url, "https://nac.example.com");
        assert_eq!(config.paths.generate, "/admin/API/generate");
        assert_eq!(config.paths.dictionaries_by_type, BasePaths::default().dictionaries_by_type);
        assert_eq!(config.cache_defeat_param, "_");
    }

    #[test]
    fn save_then_load_preserves_values() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("nested").join("config.json");
        let config = ConsoleConfig {
            timeout_secs: 5,
            ..ConsoleConfig::default()
        };
        config.save(&path).expect("save");
        assert_eq!(ConsoleConfig::load_from(&path).expect("load"), config);
    }

    #[test]
    fn load_honors_path_and_base_url_overrides() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "timeout_secs": 12 }"#).expect("write");

        temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, Some(path.to_string_lossy().to_string())),
                (BASE_URL_ENV, Some("https://nac.example.com".to_string())),
            ],
            || {
                let config = ConsoleConfig::load().expect("config");
                assert_eq!(config.timeout_secs, 12);
                assert_eq!(config.base_url, "https://nac.example.com");
            },
        );
    }

    #[test]
    fn option_cache_path_honors_override() {
        temp_env::with_var(OPTION_CACHE_PATH_ENV, Some("/tmp/nac/options.json"), || {
            assert_eq!(default_option_cache_path(), PathBuf::from("/tmp/nac/options.json"));
        });
        temp_env::with_var(OPTION_CACHE_PATH_ENV, Some("  "), || {
            assert!(default_option_cache_path().ends_with("nac-console/options.json"));
        });
    }

    #[test]
    fn plain_http_is_only_allowed_for_localhost() {
        assert!(validate_base_url("http://localhost:8080").is_ok());
        assert!(validate_base_url("http://127.0.0.1:9060").is_ok());
        assert!(validate_base_url("https://nac.example.com").is_ok());

        let error = validate_base_url("http://nac.example.com").expect_err("plain http");
        assert!(error.to_string().contains("must use https"), "unexpected error: {error}");
        assert!(validate_base_url("not a url").is_err());
    }
}
