//! HTTP client with tracing and transport-failure classification.
//!
//! This module provides a thin wrapper over `reqwest` that adds:
//! - A fixed timeout and user agent
//! - Default headers applied to every request
//! - Request/response tracing
//! - [`TransportFailure`], a coarse classification of errors that happen
//!   before any HTTP status is received

use reqwest::{Client, Response, header::HeaderMap};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent string for usagebar.
const USER_AGENT: &str = concat!("usagebar/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and default headers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        Self::builder().build()
    }

    /// Starts building a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Performs a GET request.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get(&self, url: &Url, headers: HeaderMap) -> Result<Response, reqwest::Error> {
        debug!("GET request");
        let response = self.inner.get(url.clone()).headers(headers).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with a JSON body.
    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        url: &Url,
        headers: HeaderMap,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        debug!("POST request with JSON");
        let response = self
            .inner
            .post(url.clone())
            .headers(headers)
            .json(body)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: String,
    default_headers: HeaderMap,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            default_headers: HeaderMap::new(),
        }
    }
}

impl HttpClientBuilder {
    /// Sets the total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets headers sent with every request.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails if the TLS backend cannot be initialized.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let inner = Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .default_headers(self.default_headers)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(HttpClient { inner })
    }
}

/// Joins an endpoint path onto a base URL.
///
/// # Errors
///
/// Returns `HttpError::InvalidUrl` if the result does not parse.
pub fn join_url(base: &Url, path: &str) -> Result<Url, HttpError> {
    base.join(path)
        .map_err(|e| HttpError::InvalidUrl(format!("{base}{path}: {e}")))
}

// ============================================================================
// Transport Failure Classification
// ============================================================================

/// Why a request failed before an HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// The request exceeded its timeout.
    Timeout,
    /// The local network is down.
    NetworkUnavailable,
    /// DNS failed or the host refused/dropped the connection.
    HostUnreachable,
    /// TLS handshake or certificate validation failed.
    Tls,
    /// Anything else.
    Other(String),
}

impl TransportFailure {
    /// Classifies a `reqwest` error.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        if let Some(io_err) = find_io_error(err) {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return Self::Timeout,
                io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown => {
                    return Self::NetworkUnavailable;
                }
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::HostUnreachable
                | io::ErrorKind::AddrNotAvailable => return Self::HostUnreachable,
                _ => {}
            }
        }

        let chain = error_chain_text(err);
        if is_tls_text(&chain) {
            return Self::Tls;
        }
        if err.is_connect() {
            if chain.contains("dns error") || chain.contains("failed to lookup address") {
                return Self::HostUnreachable;
            }
            if chain.contains("network is unreachable") {
                return Self::NetworkUnavailable;
            }
            return Self::HostUnreachable;
        }

        Self::Other(chain)
    }
}

fn find_io_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = e.source();
    }
    None
}

fn error_chain_text(err: &(dyn StdError + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        text.push_str(": ");
        text.push_str(&e.to_string());
        source = e.source();
    }
    text.to_lowercase()
}

fn is_tls_text(text: &str) -> bool {
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| text.contains(needle))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        let base = Url::parse("https://api.anthropic.com").unwrap();
        let url = join_url(&base, "/api/oauth/usage").unwrap();
        assert_eq!(url.as_str(), "https://api.anthropic.com/api/oauth/usage");
    }

    #[test]
    fn test_tls_text_detection() {
        assert!(is_tls_text("invalid peer certificate: unknownissuer"));
        assert!(is_tls_text("received fatal alert: handshakefailure"));
        assert!(!is_tls_text("connection reset by peer"));
    }

    #[test]
    fn test_builder_builds() {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("test-agent/1.0")
            .build();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_host_unreachable() {
        // Nothing listens on port 1 on loopback.
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let err = client.get(&url, HeaderMap::new()).await.unwrap_err();
        assert_eq!(TransportFailure::classify(&err), TransportFailure::HostUnreachable);
    }
}
