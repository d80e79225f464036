//! HTTP seam between the registry client and the network.
//!
//! The client only ever issues `GET` requests and needs the status, the
//! headers and the full body back. Redirects are never followed by the
//! transport itself; the client decides how many hops it accepts.

use std::fmt;

use burrow_common::error::{BurrowError, Result};

/// An outgoing `GET` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute target URL.
    pub url: String,
    /// Request headers in insertion order.
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Creates a `GET` request without headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first value of `name`, compared case-insensitively.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the first value of `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns up to the first 200 bytes of the body as text, for diagnostics.
    #[must_use]
    pub fn body_excerpt(&self) -> String {
        let end = self.body.len().min(200);
        String::from_utf8_lossy(&self.body[..end]).trim().to_string()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Network-level failure: the request produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Target URL.
    pub url: String,
    /// Description of the failure.
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GET {}: {}", self.url, self.message)
    }
}

impl std::error::Error for TransportError {}

/// Something that can execute a `GET` request.
pub trait HttpTransport {
    /// Sends `request` and buffers the whole response.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when no response could be obtained.
    /// Non-2xx statuses are not errors at this level.
    fn get(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        (**self).get(request)
    }
}

/// Blocking transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Builds a transport that never follows redirects on its own.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` if the TLS backend cannot be initialized.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BurrowError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let fail = |message: String| TransportError {
            url: request.url.clone(),
            message,
        };

        tracing::debug!(url = %request.url, "GET");
        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().map_err(|e| fail(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| fail(format!("failed to read response body: {e}")))?
            .to_vec();

        tracing::debug!(url = %request.url, status, bytes = body.len(), "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
