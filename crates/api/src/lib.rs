//! NAC console API client utilities.
//!
//! This crate provides the host-side collaborators of option resolution:
//!
//! - [`ConsoleConfig`]: base URL, resource base paths and timeouts
//! - [`SessionHeaderProvider`]: read versus mutating header sets
//! - [`Transport`]: the HTTP capability, implemented for `reqwest` by [`ConsoleClient`]
//!
//! # Example
//!
//! ```ignore
//! use nac_api::{ConsoleClient, ConsoleConfig};
//! use anyhow::Result;
//!
//! async fn connect() -> Result<ConsoleClient> {
//!     let config = ConsoleConfig::load()?;
//!     ConsoleClient::new(&config)
//! }
//! ```

pub mod config;
pub mod session;
pub mod transport;

use std::{env, time::Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use nac_types::HttpMethod;
use nac_util::{is_absolute_url, join_url_path};
use reqwest::{Client, Method, RequestBuilder, header};
use tracing::{debug, warn};

pub use config::{ConfigError, ConsoleConfig, default_config_path, default_option_cache_path};
pub use session::{SessionHeaderProvider, StaticSessionHeaders};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// Thin wrapper around a configured `reqwest::Client` for console API access.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ConsoleClient {
    /// Construct a client for a validated configuration.
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("build http client")?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
            user_agent: format!("nac-console/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Resolve a request URL: absolute URLs pass through, paths are joined to the base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        if is_absolute_url(url) {
            url.to_string()
        } else {
            join_url_path(&self.base_url, url)
        }
    }

    /// Build a `reqwest::RequestBuilder` for a method and a path or absolute URL.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let url = self.resolve_url(url);
        debug!(%url, "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ConsoleClient {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let start = Instant::now();
        let mut builder = self
            .request(to_reqwest_method(request.method), &request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if request.method.is_mutating()
            && let Some(body) = &request.body
        {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            warn!(
                method = %request.method,
                url = %request.url,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "http request failed before a response arrived"
            );
            if error.is_builder() {
                TransportError::Build(error.to_string())
            } else {
                TransportError::Network(error.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::Network(format!("failed to read response body: {error}")))?;
        debug!(
            method = %request.method,
            url = %request.url,
            status,
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.expect("read request");
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if let Some(header_end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{address}"), handle)
    }

    fn client_for(base_url: String) -> ConsoleClient {
        let config = ConsoleConfig {
            base_url,
            ..ConsoleConfig::default()
        };
        ConsoleClient::new(&config).expect("client")
    }

    #[test]
    fn resolve_url_joins_relative_paths_without_double_separator() {
        let client = client_for("https://nac.example.com/".into());
        assert_eq!(client.resolve_url("/api/generate"), "https://nac.example.com/api/generate");
        assert_eq!(client.resolve_url("https://other.example.com/x"), "https://other.example.com/x");
    }

    #[test]
    fn non_localhost_plain_http_is_rejected() {
        let config = ConsoleConfig {
            base_url: "http://nac.example.com".into(),
            ..ConsoleConfig::default()
        };
        assert!(ConsoleClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn get_sends_query_and_headers() {
        let (base_url, server) = serve_once("200 OK", r#"{"groups":[]}"#).await;
        let client = client_for(base_url);
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let response = client
            .execute(TransportRequest {
                method: HttpMethod::Get,
                url: "/api/generate/groups".into(),
                query: vec![("_".into(), "42".into())],
                headers,
                body: None,
            })
            .await
            .expect("response");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, r#"{"groups":[]}"#);
        let request = server.await.expect("server task");
        assert!(request.starts_with("GET /api/generate/groups?_=42 HTTP/1.1"), "request: {request}");
        assert!(request.to_lowercase().contains("accept: application/json"));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_raised() {
        let (base_url, server) = serve_once("500 Internal Server Error", r#"{"message":"boom"}"#).await;
        let client = client_for(base_url);

        let response = client
            .execute(TransportRequest {
                method: HttpMethod::Post,
                url: "/api/generate".into(),
                query: Vec::new(),
                headers: HeaderMap::new(),
                body: Some(json!({ "vendors": "radius" })),
            })
            .await
            .expect("response");

        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /api/generate HTTP/1.1"), "request: {request}");
        assert!(request.ends_with(r#"{"vendors":"radius"}"#), "request: {request}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        drop(listener);

        let client = client_for(format!("http://{address}"));
        let error = client
            .execute(TransportRequest {
                method: HttpMethod::Get,
                url: "/api/generate".into(),
                query: Vec::new(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .expect_err("connection refused");
        assert!(matches!(error, TransportError::Network(_)));
    }
}
