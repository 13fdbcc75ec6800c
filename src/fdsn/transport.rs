//! HTTP layer of the FDSN client. `HttpTransport` is the seam between the query logic and the
//! network, so that status handling can be exercised without a live service.

use crate::error::{ExplorerError, ExplorerResult};
use bytes::Bytes;
use log::debug;
use std::time::Duration;

/// Raw answer of a web service.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    /// Start of the body as text, for error messages.
    pub fn body_excerpt(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let text = text.trim();
        match text.char_indices().nth(300) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

/// Blocking GET requests.
///
/// Implementations return `Ok` for every HTTP answer, whatever its status, and
/// `ExplorerError::ServiceUnavailable` when no answer could be obtained.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, params: &[(String, String)]) -> ExplorerResult<HttpResponse>;
}

/// Production transport backed by `reqwest`'s blocking client.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> ExplorerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ExplorerError::ServiceUnavailable(format!("cannot create HTTP client: {e}"))
            })?;
        Ok(ReqwestTransport {
            client,
            credentials: None,
        })
    }

    /// Sends HTTP basic authentication with every request.
    pub fn with_credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> ExplorerResult<HttpResponse> {
        let mut request = self.client.get(url).query(params);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }
        let response = request.send().map_err(|e| {
            ExplorerError::ServiceUnavailable(format!("request to {url} failed: {e}"))
        })?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| {
            ExplorerError::ServiceUnavailable(format!("reading answer of {url} failed: {e}"))
        })?;
        debug!("{url} answered {status} with {} bytes", body.len());
        Ok(HttpResponse { status, body })
    }
}
