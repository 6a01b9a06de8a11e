//! In-process [`HttpTransport`] for tests.
//!
//! Compiled for this crate's own tests and, through the `test-util`
//! feature, for dependants' tests.

use std::sync::Mutex;

use async_trait::async_trait;
use moltpilot_core::error::{Error, Result};

use crate::network::{HttpMethod, HttpTransport, TransportRequest, TransportResponse};

/// One scripted route: method plus a URL substring.
struct Route {
    method: HttpMethod,
    url_contains: String,
    response: std::result::Result<TransportResponse, String>,
}

/// In-process transport that answers from a route table and records every
/// request it sees. Unmatched requests get `404`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests matching `method` and `url_contains` with `status`/`body`.
    /// Earlier routes win.
    pub fn route(
        self,
        method: HttpMethod,
        url_contains: &str,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.push(Route {
            method,
            url_contains: url_contains.into(),
            response: Ok(TransportResponse {
                status,
                body: body.into(),
            }),
        });
        self
    }

    /// Fail matching requests with a transport error.
    pub fn fail(self, method: HttpMethod, url_contains: &str, reason: &str) -> Self {
        self.push(Route {
            method,
            url_contains: url_contains.into(),
            response: Err(reason.into()),
        });
        self
    }

    fn push(&self, route: Route) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route);
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests whose URL contains `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.as_str().contains(fragment))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = request.url.to_string();
        let method = request.method;
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }

        let routes = self
            .routes
            .lock()
            .map_err(|_| Error::Internal("scripted transport poisoned".into()))?;
        let matched = routes
            .iter()
            .find(|r| r.method == method && url.contains(&r.url_contains));

        match matched {
            Some(Route {
                response: Ok(response),
                ..
            }) => Ok(response.clone()),
            Some(Route {
                response: Err(reason),
                ..
            }) => Err(Error::Transport(reason.clone())),
            None => Ok(TransportResponse {
                status: 404,
                body: format!("no scripted route for {method} {url}"),
            }),
        }
    }
}
