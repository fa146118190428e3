//! Anthropic OAuth API client.
//!
//! # Endpoints
//!
//! ```text
//! GET  https://api.anthropic.com/api/oauth/usage
//! GET  https://api.anthropic.com/api/oauth/profile
//! POST https://api.anthropic.com/api/oauth/token
//! Authorization: Bearer <access_token>
//! anthropic-beta: oauth-2025-04-20
//! ```
//!
//! # Usage Response
//!
//! ```json
//! {
//!   "five_hour": {"utilization": 25.0, "resets_at": "2025-01-01T12:00:00Z"},
//!   "seven_day": {"utilization": 45.0, "resets_at": "2025-01-05T00:00:00Z"},
//!   "seven_day_sonnet": null
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;
use usagebar_core::{ProfileSnapshot, UsageSnapshot};
use usagebar_fetch::{HttpClient, RetryPolicy, join_url};

use crate::credentials::CredentialResolver;
use crate::error::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Anthropic API.
pub const API_BASE_URL: &str = "https://api.anthropic.com";

/// Usage endpoint.
pub const USAGE_ENDPOINT: &str = "/api/oauth/usage";

/// Profile endpoint.
pub const PROFILE_ENDPOINT: &str = "/api/oauth/profile";

/// Token endpoint.
pub const TOKEN_ENDPOINT: &str = "/api/oauth/token";

/// User agent the OAuth endpoints expect.
pub const USER_AGENT: &str = "claude-code/2.1.7";

/// Beta header required by the OAuth endpoints.
pub const BETA_HEADER_NAME: &str = "anthropic-beta";

/// Value of [`BETA_HEADER_NAME`].
pub const BETA_HEADER_VALUE: &str = "oauth-2025-04-20";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

/// API client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and host; endpoint paths are joined onto it.
    pub base_url: String,
    /// `User-Agent` header.
    pub user_agent: String,
    /// `anthropic-beta` header value.
    pub beta_header: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Attempt budget and backoff for GET requests.
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            user_agent: USER_AGENT.to_string(),
            beta_header: BETA_HEADER_VALUE.to_string(),
            timeout: REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// Token Refresh
// ============================================================================

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Tokens minted by the token endpoint.
///
/// They are handed to the caller only; nothing is written to the
/// credentials file or the secret store.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRefresh {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, if the server issued one.
    pub refresh_token: Option<String>,
    /// Lifetime of the new access token.
    pub expires_in: Option<Duration>,
}

impl fmt::Debug for TokenRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresh")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// ============================================================================
// Usage API Seam
// ============================================================================

/// The two fetches a refresh needs.
#[async_trait]
pub trait UsageApi: Send + Sync {
    /// Fetches current quota utilization.
    async fn fetch_usage(&self) -> Result<UsageSnapshot, ApiError>;

    /// Fetches account and organization metadata.
    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError>;
}

// ============================================================================
// API Client
// ============================================================================

/// Authenticated client for the OAuth usage endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: Url,
    beta_header: HeaderValue,
    retry: RetryPolicy,
    credentials: Arc<CredentialResolver>,
}

impl ApiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// - `InvalidUrl` if `base_url` does not parse
    /// - `ClientSetup` if a header value is invalid or TLS cannot initialize
    pub fn new(config: ApiConfig, credentials: Arc<CredentialResolver>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        let beta_header = HeaderValue::from_str(&config.beta_header)
            .map_err(|e| ApiError::ClientSetup(format!("beta header: {e}")))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::ClientSetup(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            beta_header,
            retry: config.retry,
            credentials,
        })
    }

    /// Returns the credential resolver.
    pub fn credentials(&self) -> &Arc<CredentialResolver> {
        &self.credentials
    }

    /// Fetches current quota utilization.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] after retries are exhausted.
    #[instrument(skip(self))]
    pub async fn fetch_usage(&self) -> Result<UsageSnapshot, ApiError> {
        let snapshot: UsageSnapshot = self.get_json(USAGE_ENDPOINT).await?;
        snapshot
            .validate()
            .map_err(|e| ApiError::DecodingError(e.to_string()))?;
        debug!(windows = snapshot.windows().count(), "Usage fetched");
        Ok(snapshot)
    }

    /// Fetches account and organization metadata.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] after retries are exhausted.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError> {
        self.get_json(PROFILE_ENDPOINT).await
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Not retried. On success the resolver cache is dropped so the next
    /// fetch re-reads whatever the credential owner has stored.
    ///
    /// # Errors
    ///
    /// - `NoRefreshToken` if no refresh token is available
    /// - `TokenRefreshFailed(code)` for any status other than 200
    /// - transport errors as classified by [`ApiError::from_transport`]
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<TokenRefresh, ApiError> {
        let refresh_token = self
            .credentials
            .credentials()
            .await
            .ok()
            .and_then(|c| c.refresh_token)
            .ok_or(ApiError::NoRefreshToken)?;

        let url = self.endpoint(TOKEN_ENDPOINT)?;
        let body = serde_json::json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });

        let response = self
            .http
            .post_json(&url, HeaderMap::new(), &body)
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(status, "Token refresh rejected");
            return Err(ApiError::TokenRefreshFailed(status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        let parsed: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::DecodingError(e.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::DecodingError("missing access_token".to_string()))?;

        self.credentials.invalidate_cache().await;
        info!(expires_in = ?parsed.expires_in, "Access token refreshed");

        Ok(TokenRefresh {
            access_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in.map(Duration::from_secs),
        })
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        join_url(&self.base_url, path).map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    /// Resolves a usable bearer token. Failures here are never retried.
    async fn bearer_token(&self) -> Result<String, ApiError> {
        match self.credentials.credentials().await {
            Ok(credentials) if credentials.is_expired() => {
                debug!(expires_at = ?credentials.expires_at(), "Stored token expired");
                Err(ApiError::TokenExpired)
            }
            Ok(credentials) => Ok(credentials.access_token),
            Err(e) if self.credentials.credentials_file_exists() => {
                warn!(error = %e, "Credentials file present but unusable");
                Err(ApiError::CredentialsCorrupted)
            }
            Err(e) => {
                debug!(error = %e, "No credentials");
                Err(ApiError::NoToken)
            }
        }
    }

    fn request_headers(&self, token: &str) -> Result<HeaderMap, ApiError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::CredentialsCorrupted)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static(BETA_HEADER_NAME),
            self.beta_header.clone(),
        );
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.bearer_token().await?;
        let url = self.endpoint(path)?;
        let headers = self.request_headers(&token)?;

        let url = &url;
        let result = self
            .retry
            .run(
                |attempt| {
                    let headers = headers.clone();
                    async move {
                        debug!(attempt, url = %url, "Sending request");
                        self.execute(url, headers).await
                    }
                },
                ApiError::is_retryable,
            )
            .await;

        if matches!(result, Err(ApiError::TokenExpired)) {
            // The server rejected a token we thought was valid.
            self.credentials.invalidate_cache().await;
        }
        result
    }

    async fn execute<T: DeserializeOwned>(&self, url: &Url, headers: HeaderMap) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url, headers)
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if let Some(err) = ApiError::from_status(status, &body) {
            debug!(status, error = %err, "Request failed");
            return Err(err);
        }

        serde_json::from_slice(&body).map_err(|e| ApiError::DecodingError(e.to_string()))
    }
}

#[async_trait]
impl UsageApi for ApiClient {
    async fn fetch_usage(&self) -> Result<UsageSnapshot, ApiError> {
        ApiClient::fetch_usage(self).await
    }

    async fn fetch_profile(&self) -> Result<ProfileSnapshot, ApiError> {
        ApiClient::fetch_profile(self).await
    }
}

// ============================================================================
// Tests
// ============================================================================
