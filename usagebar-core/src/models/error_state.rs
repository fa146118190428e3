//! User-facing error classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse grouping of refresh failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing, expired, or corrupt credentials. Needs a fresh login.
    Authentication,
    /// Transport failure (offline, DNS, TLS, timeout).
    Network,
    /// The server asked us to slow down.
    RateLimit,
    /// The account may not use this endpoint.
    Permission,
    /// 5xx from the server.
    Server,
    /// Anything else, including undecodable responses.
    Unknown,
}

impl ErrorCategory {
    /// Short label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication",
            Self::Network => "Network",
            Self::RateLimit => "Rate limit",
            Self::Permission => "Permission",
            Self::Server => "Server",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The outcome of the last failed refresh, as shown to the user.
///
/// Replaced on every failed refresh and cleared on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    /// Error grouping.
    pub category: ErrorCategory,
    /// Human-readable description.
    pub message: String,
    /// Whether waiting or retrying can fix it without user action.
    pub recoverable: bool,
    /// What the user should do next, if anything.
    pub action_hint: Option<String>,
}

impl ErrorState {
    /// Creates a new error state.
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        recoverable: bool,
        action_hint: Option<&str>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            recoverable,
            action_hint: action_hint.map(str::to_string),
        }
    }
}

impl fmt::Display for ErrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(hint) = &self.action_hint {
            write!(f, " ({hint})")?;
        }
        Ok(())
    }
}
