//! In-memory transport used by unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use nac_api::{StaticSessionHeaders, Transport, TransportError, TransportRequest, TransportResponse};
use nac_types::HttpMethod;

use crate::Resolver;

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, body: String },
    Fail(String),
}

/// Answers calls from a route table keyed by `"<METHOD> <url>"` and records
/// every request it sees. Unknown routes answer `404` with an empty body.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, method: HttpMethod, url: &str, status: u16, body: &str) -> Self {
        self.set_response(method, url, status, body);
        self
    }

    pub(crate) fn fail(self, method: HttpMethod, url: &str, message: &str) -> Self {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(format!("{method} {url}"), Route::Fail(message.to_string()));
        self
    }

    /// Replace the answer for a route on a transport that is already shared.
    pub(crate) fn set_response(&self, method: HttpMethod, url: &str, status: u16, body: &str) {
        self.routes.lock().expect("routes lock").insert(
            format!("{method} {url}"),
            Route::Respond {
                status,
                body: body.to_string(),
            },
        );
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let route = self
            .routes
            .lock()
            .expect("routes lock")
            .get(&format!("{} {}", request.method, request.url))
            .cloned();
        self.requests.lock().expect("requests lock").push(request);

        match route {
            Some(Route::Respond { status, body }) => Ok(TransportResponse { status, body }),
            Some(Route::Fail(message)) => Err(TransportError::Network(message)),
            None => Ok(TransportResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

pub(crate) fn resolver_for(transport: &Arc<RecordingTransport>) -> Resolver {
    let headers = StaticSessionHeaders::new(Some("test-token"), Some("csrf-token")).expect("headers");
    Resolver::new(Arc::clone(transport) as Arc<dyn Transport>, Arc::new(headers))
}
