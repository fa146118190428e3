//! JSON output formatting.
//!
//! Snapshots are emitted in their wire shape, wrapped in small envelopes that
//! add fetch time and status fields.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::path::Path;
use usagebar_anthropic::{CredentialDiagnosis, CredentialError, OAuthCredentials};
use usagebar_core::{ErrorCategory, ErrorState, ProfileSnapshot, UsageSnapshot};
use usagebar_store::DashboardState;

// ============================================================================
// Output Types
// ============================================================================

/// One-shot usage and profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport<'a> {
    pub usage: &'a UsageSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a ProfileSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_utilization: Option<f64>,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
}

impl<'a> UsageReport<'a> {
    pub fn new(usage: &'a UsageSnapshot, profile: Option<&'a ProfileSnapshot>) -> Self {
        Self {
            usage,
            profile,
            max_utilization: usage.max_utilization(),
            fetched_at: Utc::now(),
        }
    }
}

/// One line of `watch` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<&'a UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<&'a ProfileSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a ErrorState>,
    pub is_loading: bool,
    pub consecutive_failures: u32,
    pub auto_refresh_active: bool,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl<'a> From<&'a DashboardState> for DashboardOutput<'a> {
    fn from(state: &'a DashboardState) -> Self {
        Self {
            usage: state.usage.as_deref(),
            profile: state.profile.as_deref(),
            error: state.error.as_ref(),
            is_loading: state.is_loading,
            consecutive_failures: state.consecutive_failures,
            auto_refresh_active: state.auto_refresh_active,
            last_updated: state.last_updated,
        }
    }
}

/// Failure report printed instead of a result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput<'a> {
    pub error: &'a str,
    pub category: ErrorCategory,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'a str>,
}

impl<'a> From<&'a ErrorState> for ErrorOutput<'a> {
    fn from(state: &'a ErrorState) -> Self {
        Self {
            error: &state.message,
            category: state.category,
            recoverable: state.recoverable,
            hint: state.action_hint.as_deref(),
        }
    }
}

/// Credential report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusOutput<'a> {
    pub credentials_path: &'a Path,
    pub file: SourceOutput,
    pub secret_store: SourceOutput,
}

impl<'a> From<&'a CredentialDiagnosis> for AuthStatusOutput<'a> {
    fn from(diagnosis: &'a CredentialDiagnosis) -> Self {
        Self {
            credentials_path: &diagnosis.file_path,
            file: SourceOutput::from(&diagnosis.file),
            secret_store: SourceOutput::from(&diagnosis.secret_store),
        }
    }
}

/// Outcome of one credential source. Tokens are never included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOutput {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_refresh_token: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<OAuthCredentials, CredentialError>> for SourceOutput {
    fn from(outcome: &Result<OAuthCredentials, CredentialError>) -> Self {
        match outcome {
            Ok(credentials) => Self {
                available: true,
                expired: Some(credentials.is_expired()),
                expires_at: credentials.expires_at(),
                subscription_type: credentials.subscription_type.clone(),
                has_refresh_token: Some(credentials.refresh_token.is_some()),
                error: None,
            },
            Err(e) => Self {
                available: false,
                expired: None,
                expires_at: None,
                subscription_type: None,
                has_refresh_token: None,
                error: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
