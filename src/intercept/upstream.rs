//! Fetching the real backend response behind an intercepted call

use async_trait::async_trait;
use std::time::Duration;

use crate::common::config::Config;
use crate::common::{Error, Result};

/// An outgoing call captured by the automation driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl InterceptedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }
}

/// A complete response as delivered back to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace the body, keeping status and headers
    ///
    /// A `content-length` header, if present, is updated to the new size so
    /// the page does not truncate the payload.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        let len = body.len().to_string();
        for (name, value) in self.headers.iter_mut() {
            if name.eq_ignore_ascii_case("content-length") {
                *value = len.clone();
            }
        }
        self.body = body;
        self
    }
}

/// Source of the true response for an intercepted call
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform the call unmodified
    ///
    /// Any transport failure must surface as [`Error::UpstreamFetch`].
    /// HTTP error statuses are responses, not failures.
    async fn fetch(&self, request: &InterceptedRequest) -> Result<UpstreamResponse>;
}

/// [`Upstream`] backed by a reqwest client
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Client that returns redirects to the page instead of following them
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Client bounded by `[timeouts] upstream_request_secs`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.upstream_timeout())
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<UpstreamResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::upstream_fetch(&request.url, e))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::upstream_fetch(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::upstream_fetch(&request.url, e))?
            .to_vec();

        tracing::trace!(url = %request.url, status, bytes = body.len(), "Upstream responded");

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
