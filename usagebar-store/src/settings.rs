//! User settings.
//!
//! Persisted as pretty JSON at `<config_dir>/usagebar/settings.json`. Every
//! field has a default, so a partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use usagebar_anthropic::credentials::default_credentials_path;
use usagebar_anthropic::{ApiConfig, ResolverConfig, SecretStore};
use usagebar_fetch::RetryPolicy;

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};
use crate::refresh::PollingConfig;

/// Upper bound on `max_attempts`.
const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Longest accepted polling interval, one day.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between automatic refreshes.
    pub refresh_interval_secs: u64,

    /// Failed refreshes in a row before auto-refresh pauses itself.
    pub max_consecutive_failures: u32,

    /// API scheme and host.
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Attempts per request, including the first.
    pub max_attempts: u32,

    /// Backoff unit in milliseconds.
    pub retry_base_delay_ms: u64,

    /// How long resolved credentials are reused.
    pub credential_cache_ttl_secs: u64,

    /// Override for `~/.claude/.credentials.json`.
    pub credentials_path: Option<PathBuf>,

    /// Secret-store backend.
    pub secret_store: SecretStoreMode,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            refresh_interval_secs: 30,
            max_consecutive_failures: 5,
            api_base_url: api.base_url,
            request_timeout_secs: api.timeout.as_secs(),
            max_attempts: api.retry.max_attempts,
            retry_base_delay_ms: 1000,
            credential_cache_ttl_secs: 60,
            credentials_path: None,
            secret_store: SecretStoreMode::default(),
            log_level: LogLevel::default(),
        }
    }
}

/// Secret-store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SecretStoreMode {
    /// `security` on macOS, the platform keyring elsewhere.
    #[default]
    Auto,
    /// macOS `security find-generic-password`.
    KeychainCommand,
    /// Platform keyring.
    Keyring,
    /// Credentials file only.
    Disabled,
}

impl SecretStoreMode {
    /// Resolves to a concrete backend.
    pub fn to_secret_store(self) -> SecretStore {
        match self {
            SecretStoreMode::Auto => SecretStore::platform_default(),
            SecretStoreMode::KeychainCommand => SecretStore::macos_keychain(),
            SecretStoreMode::Keyring => SecretStore::keyring(),
            SecretStoreMode::Disabled => SecretStore::Disabled,
        }
    }
}

impl std::fmt::Display for SecretStoreMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStoreMode::Auto => write!(f, "auto"),
            SecretStoreMode::KeychainCommand => write!(f, "keychain-command"),
            SecretStoreMode::Keyring => write!(f, "keyring"),
            SecretStoreMode::Disabled => write!(f, "disabled"),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    Warn,
    /// Info level logging.
    #[default]
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Load / Save
// ============================================================================

impl Settings {
    /// Loads and validates settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if there is no config directory, or the file exists but
    /// is unreadable, corrupt or invalid.
    pub async fn load_default() -> Result<Self, StoreError> {
        let path = default_settings_path().ok_or(StoreError::NoConfigDir)?;
        Self::load(&path).await
    }

    /// Loads and validates settings. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but is unreadable, corrupt or invalid.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let settings: Settings = load_json_or_default(path).await?;
        settings.validate()?;
        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Validates and writes settings.
    ///
    /// # Errors
    ///
    /// Returns error if validation fails or the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        save_json(path, self).await?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Checks every field for a usable value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidSetting` for the first bad field.
    pub fn validate(&self) -> Result<(), StoreError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> StoreError {
            StoreError::InvalidSetting {
                field,
                reason: reason.into(),
            }
        }

        if self.refresh_interval_secs == 0 || self.refresh_interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(invalid(
                "refresh_interval_secs",
                format!("must be between 1 and {MAX_REFRESH_INTERVAL_SECS}"),
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(invalid("max_consecutive_failures", "must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be greater than zero"));
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(invalid(
                "max_attempts",
                format!("must be between 1 and {MAX_ATTEMPTS_LIMIT}"),
            ));
        }

        let url = Url::parse(&self.api_base_url)
            .map_err(|e| invalid("api_base_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(
                "api_base_url",
                format!("unsupported scheme `{}`", url.scheme()),
            ));
        }

        Ok(())
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// API client configuration.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            retry: RetryPolicy::new(self.max_attempts)
                .with_base_delay(Duration::from_millis(self.retry_base_delay_ms)),
            ..ApiConfig::default()
        }
    }

    /// Credential resolver configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if no override is set and the home
    /// directory is unknown.
    pub fn resolver_config(&self) -> Result<ResolverConfig, StoreError> {
        let credentials_path = match &self.credentials_path {
            Some(path) => path.clone(),
            None => default_credentials_path()
                .ok_or_else(|| StoreError::Config("could not determine home directory".to_string()))?,
        };

        Ok(ResolverConfig {
            credentials_path,
            secret_store: self.secret_store.to_secret_store(),
            cache_ttl: Duration::from_secs(self.credential_cache_ttl_secs),
        })
    }

    /// Orchestrator configuration.
    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_secs(self.refresh_interval_secs),
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_client_constants() {
        let settings = Settings::default();
        assert_eq!(settings.refresh_interval_secs, 30);
        assert_eq!(settings.max_consecutive_failures, 5);
        assert_eq!(settings.api_base_url, "https://api.anthropic.com");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.max_attempts, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"refresh_interval_secs": 120, "secret_store": "disabled"}"#)
                .unwrap();
        assert_eq!(settings.refresh_interval_secs, 120);
        assert_eq!(settings.secret_store, SecretStoreMode::Disabled);
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    fn test_secret_store_mode_wire_names() {
        let json = serde_json::to_string(&SecretStoreMode::KeychainCommand).unwrap();
        assert_eq!(json, "\"keychain-command\"");
        assert_eq!(SecretStoreMode::KeychainCommand.to_string(), "keychain-command");
        assert_eq!(SecretStoreMode::Disabled.to_secret_store(), SecretStore::Disabled);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            Settings {
                refresh_interval_secs: 0,
                ..Settings::default()
            },
            Settings {
                refresh_interval_secs: MAX_REFRESH_INTERVAL_SECS + 1,
                ..Settings::default()
            },
            Settings {
                refresh_interval_secs: u64::MAX,
                ..Settings::default()
            },
            Settings {
                max_consecutive_failures: 0,
                ..Settings::default()
            },
            Settings {
                max_attempts: 0,
                ..Settings::default()
            },
            Settings {
                max_attempts: 11,
                ..Settings::default()
            },
            Settings {
                api_base_url: "not a url".to_string(),
                ..Settings::default()
            },
            Settings {
                api_base_url: "ftp://api.anthropic.com".to_string(),
                ..Settings::default()
            },
        ];

        for settings in cases {
            assert!(
                matches!(settings.validate(), Err(StoreError::InvalidSetting { .. })),
                "{settings:?}"
            );
        }
    }

    #[test]
    fn test_refresh_interval_upper_bound_is_inclusive() {
        let settings = Settings {
            refresh_interval_secs: MAX_REFRESH_INTERVAL_SECS,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.polling_config().interval,
            Duration::from_secs(MAX_REFRESH_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_conversions() {
        let settings = Settings {
            refresh_interval_secs: 45,
            max_attempts: 4,
            retry_base_delay_ms: 250,
            credential_cache_ttl_secs: 5,
            credentials_path: Some(PathBuf::from("/tmp/creds.json")),
            secret_store: SecretStoreMode::Disabled,
            ..Settings::default()
        };

        let api = settings.api_config();
        assert_eq!(api.retry.max_attempts, 4);
        assert_eq!(api.retry.base_delay, Duration::from_millis(250));
        assert_eq!(api.user_agent, "claude-code/2.1.7");

        let resolver = settings.resolver_config().unwrap();
        assert_eq!(resolver.credentials_path, PathBuf::from("/tmp/creds.json"));
        assert_eq!(resolver.secret_store, SecretStore::Disabled);
        assert_eq!(resolver.cache_ttl, Duration::from_secs(5));

        let polling = settings.polling_config();
        assert_eq!(polling.interval, Duration::from_secs(45));
        assert_eq!(polling.max_consecutive_failures, 5);
    }
}
