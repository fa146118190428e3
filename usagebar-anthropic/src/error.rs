//! Error types for credential resolution and API calls.

use std::path::PathBuf;
use thiserror::Error;
use usagebar_core::{ErrorCategory, ErrorState};
use usagebar_fetch::TransportFailure;

/// Hint shown for every authentication failure.
const LOGIN_HINT: &str = "Run: claude login";

// ============================================================================
// Credential Error
// ============================================================================

/// Why credentials could not be loaded from a source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// `$HOME` could not be determined.
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    /// The credentials file does not exist.
    #[error("Credentials file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The credentials file exists but could not be read.
    #[error("Cannot read credentials file: {0}")]
    FileNotReadable(String),

    /// The payload is not valid JSON.
    #[error("Invalid credentials format: {0}")]
    InvalidJson(String),

    /// The payload is JSON but lacks the OAuth section or its required fields.
    #[error("OAuth credentials missing: {0}")]
    MissingOAuthData(String),

    /// The secret store could not be queried at all.
    #[error("Secret store unavailable: {0}")]
    SecretStoreUnavailable(String),

    /// The secret-store lookup ran and reported failure.
    #[error("Secret store lookup failed (status: {0})")]
    SecretStoreFailed(i32),

    /// The secret store has no entry, or an empty one.
    #[error("Secret store returned no credentials")]
    SecretStoreEmpty,

    /// Secret-store lookups are turned off in settings.
    #[error("Secret store lookup disabled")]
    SecretStoreDisabled,

    /// Every source failed.
    #[error("No credentials found (file: {file}; secret store: {secret_store})")]
    MissingCredentials {
        /// Why the file source failed.
        file: Box<CredentialError>,
        /// Why the secret-store source failed.
        secret_store: Box<CredentialError>,
    },
}

impl CredentialError {
    /// Returns true if the credentials file simply does not exist.
    pub fn is_file_absent(&self) -> bool {
        match self {
            Self::FileNotFound(_) => true,
            Self::MissingCredentials { file, .. } => file.is_file_absent(),
            _ => false,
        }
    }
}

// ============================================================================
// API Error
// ============================================================================

/// Classified failure of an API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No credentials anywhere.
    #[error("No credentials found. Start Claude to login")]
    NoToken,

    /// The token is expired (locally, or rejected with 401).
    #[error("Session expired. Start Claude to refresh")]
    TokenExpired,

    /// A refresh was requested but no refresh token is stored.
    #[error("No refresh token. Start Claude to refresh")]
    NoRefreshToken,

    /// The token endpoint rejected the refresh.
    #[error("Token refresh failed ({0}). Start Claude to refresh")]
    TokenRefreshFailed(u16),

    /// A credentials file exists but yielded no usable token.
    #[error("Credentials corrupted. Start Claude to login")]
    CredentialsCorrupted,

    /// The endpoint URL could not be built.
    #[error("Invalid endpoint: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    /// The response body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    DecodingError(String),

    /// Unexpected non-error status (1xx/3xx).
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// 4xx not covered by a specific variant.
    #[error("{}", client_error_text(.status, .message.as_deref()))]
    ClientError {
        /// Status code.
        status: u16,
        /// Server-provided message, if any.
        message: Option<String>,
    },

    /// 5xx.
    #[error("Server error ({0}). Try again later.")]
    ServerError(u16),

    /// 403.
    #[error("Access denied. Check your subscription.")]
    Forbidden,

    /// 404.
    #[error("API endpoint not found")]
    NotFound,

    /// 429.
    #[error("Rate limited. Please wait.")]
    RateLimited,

    /// Transport failure with no more specific classification.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The local network is down.
    #[error("No internet connection")]
    NetworkUnavailable,

    /// DNS failed or the server refused the connection.
    #[error("Cannot reach server")]
    HostUnreachable,

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// TLS failure.
    #[error("Secure connection failed")]
    SslError,

    /// The request was abandoned. Not a failure; never shown to the user.
    #[error("Request cancelled")]
    Cancelled,
}

fn client_error_text(status: &u16, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("Request failed ({status}): {message}"),
        None => format!("Request failed: {status}"),
    }
}

impl ApiError {
    /// Maps a transport failure to its API error.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        match TransportFailure::classify(err) {
            TransportFailure::Timeout => Self::Timeout,
            TransportFailure::NetworkUnavailable => Self::NetworkUnavailable,
            TransportFailure::HostUnreachable => Self::HostUnreachable,
            TransportFailure::Tls => Self::SslError,
            TransportFailure::Other(detail) => Self::NetworkError(detail),
        }
    }

    /// Maps an HTTP status to an error, or `None` for 2xx.
    pub fn from_status(status: u16, body: &[u8]) -> Option<Self> {
        let err = match status {
            200..=299 => return None,
            401 => Self::TokenExpired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            400..=499 => Self::ClientError {
                status,
                message: extract_error_message(body),
            },
            500..=599 => Self::ServerError(status),
            _ => Self::HttpError(status),
        };
        Some(err)
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::NetworkUnavailable
                | Self::HostUnreachable
                | Self::Timeout
                | Self::ServerError(_)
        )
    }

    /// Failures only a fresh login can fix.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::NoToken
                | Self::TokenExpired
                | Self::NoRefreshToken
                | Self::TokenRefreshFailed(_)
                | Self::CredentialsCorrupted
        )
    }

    /// Returns true for the cancellation sentinel.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Converts to the user-facing error state. `None` for [`ApiError::Cancelled`].
    pub fn to_error_state(&self) -> Option<ErrorState> {
        let (category, recoverable, hint) = match self {
            Self::Cancelled => return None,
            e if e.requires_reauthentication() => {
                (ErrorCategory::Authentication, false, Some(LOGIN_HINT))
            }
            Self::NetworkUnavailable => (
                ErrorCategory::Network,
                true,
                Some("Check your internet connection"),
            ),
            Self::HostUnreachable | Self::Timeout => (
                ErrorCategory::Network,
                true,
                Some("Server may be temporarily unavailable"),
            ),
            Self::SslError | Self::NetworkError(_) => {
                (ErrorCategory::Network, true, Some("Try again later"))
            }
            Self::RateLimited => (ErrorCategory::RateLimit, true, Some("Please wait a moment")),
            Self::Forbidden => (
                ErrorCategory::Permission,
                false,
                Some("Check your subscription status"),
            ),
            Self::ServerError(_) => (ErrorCategory::Server, true, Some("Try again later")),
            _ => (ErrorCategory::Unknown, true, None),
        };
        Some(ErrorState::new(category, self.to_string(), recoverable, hint))
    }
}

/// Pulls a message out of `{"error":{"message":..}}` or `{"message":..}`.
fn extract_error_message(body: &[u8]) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
        message: Option<String>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed.error.and_then(|e| e.message).or(parsed.message)
}

// ============================================================================
// Tests
// ============================================================================
