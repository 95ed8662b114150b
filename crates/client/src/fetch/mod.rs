//! Upstream HTTP fetch pipeline.
//!
//! The gateway never talks to the network directly; it goes through the
//! `Fetch` trait so tests can substitute a fake. `FetchClient` is the real
//! implementation over reqwest.
//!
//! Failure contract: transport errors (unreachable, DNS, timeout) map to
//! `Error::Transport`. HTTP error statuses are NOT errors here — a resolved
//! 4xx/5xx response is returned as-is for the strategies to pass through.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};

pub use url::{UrlError, canonicalize, same_origin};

use dimts_core::Error;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "dimts-gw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "dimts-gw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// An outbound request as handed to the network capability.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method name.
    pub method: String,
    /// Absolute URL to fetch.
    pub url: Url,
    /// Headers to forward upstream, hop-by-hop already stripped.
    pub headers: Vec<(String, String)>,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// A plain GET with no forwarded headers, as issued for install fetches.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, headers: Vec::new(), body: None }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// The network capability the gateway depends on.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a URL, returning raw bytes and metadata.
    ///
    /// Only transport-level failures are errors; any resolved response,
    /// whatever its status, is Ok.
    async fn fetch(&self, request: &OutboundRequest) -> Result<FetchResponse, Error>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for std::sync::Arc<T> {
    async fn fetch(&self, request: &OutboundRequest) -> Result<FetchResponse, Error> {
        (**self).fetch(request).await
    }
}

/// HTTP fetch client over reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn fetch(&self, request: &OutboundRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("bad method {}: {}", request.method, e)))?;

        let mut outbound = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            outbound = outbound.header(name, value);
        }
        if let Some(body) = &request.body {
            outbound = outbound.body(body.clone());
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| Error::Transport(format!("network error: {}", e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::TooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
