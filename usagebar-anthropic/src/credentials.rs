//! OAuth credential resolution.
//!
//! Claude Code stores its OAuth credentials in one of two places:
//!
//! 1. **File**: `~/.claude/.credentials.json`
//! 2. **Secret store**: macOS Keychain service `Claude Code-credentials`
//!    (read through `security find-generic-password`), or the platform
//!    keyring elsewhere
//!
//! Both hold the same JSON document:
//!
//! ```json
//! {
//!   "claudeAiOauth": {
//!     "accessToken": "...",
//!     "refreshToken": "...",
//!     "expiresAt": 1735000000000,
//!     "scopes": ["user:inference", "user:profile"],
//!     "subscriptionType": "max"
//!   }
//! }
//! ```
//!
//! The resolver tries the file first (no unlock prompt), then the secret
//! store. The first source that yields credentials wins and is cached for a
//! short TTL; sources are never merged.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, trace, warn};
use usagebar_fetch::host::keychain::current_username;
use usagebar_fetch::{ProcessError, ProcessRunner, SystemKeychain};

use crate::error::CredentialError;

// ============================================================================
// Constants
// ============================================================================

/// Secret-store service name used by Claude Code.
pub const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

/// How long resolved credentials are reused before re-reading.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Tokens expiring within this window are treated as already expired.
pub const EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

// ============================================================================
// Wire Format
// ============================================================================

/// OAuth section of the credentials document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuthCredentialsData {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    #[serde(default)]
    scopes: Vec<String>,
    subscription_type: Option<String>,
    rate_limit_tier: Option<String>,
}

// ============================================================================
// OAuth Credentials
// ============================================================================

/// Where credentials were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `~/.claude/.credentials.json` (or the configured override).
    File,
    /// An external lookup command (macOS `security`).
    KeychainCommand,
    /// The platform keyring.
    Keyring,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::KeychainCommand => "keychain",
            Self::Keyring => "keyring",
        })
    }
}

/// Parsed OAuth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to mint a new access token.
    pub refresh_token: Option<String>,
    /// Expiry, milliseconds since the Unix epoch.
    pub expires_at_ms: Option<i64>,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Subscription type recorded by the CLI (e.g. "max").
    pub subscription_type: Option<String>,
    /// Rate limit tier recorded by the CLI.
    pub rate_limit_tier: Option<String>,
    /// Which source produced these credentials.
    pub source: CredentialSource,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at_ms", &self.expires_at_ms)
            .field("scopes", &self.scopes)
            .field("subscription_type", &self.subscription_type)
            .field("rate_limit_tier", &self.rate_limit_tier)
            .field("source", &self.source)
            .finish()
    }
}

impl OAuthCredentials {
    /// Parses a credentials document.
    ///
    /// # Errors
    ///
    /// - `InvalidJson` if the text is not JSON
    /// - `MissingOAuthData` if `claudeAiOauth` or its required fields are absent
    pub fn parse(json: &str, source: CredentialSource) -> Result<Self, CredentialError> {
        let root: serde_json::Value =
            serde_json::from_str(json).map_err(|e| CredentialError::InvalidJson(e.to_string()))?;

        let oauth = root
            .get("claudeAiOauth")
            .filter(|v| !v.is_null())
            .ok_or_else(|| CredentialError::MissingOAuthData("no claudeAiOauth section".to_string()))?;

        let data = OAuthCredentialsData::deserialize(oauth)
            .map_err(|e| CredentialError::MissingOAuthData(e.to_string()))?;

        if data.access_token.trim().is_empty() {
            return Err(CredentialError::MissingOAuthData(
                "accessToken is empty".to_string(),
            ));
        }

        Ok(Self {
            access_token: data.access_token,
            refresh_token: data.refresh_token.filter(|t| !t.is_empty()),
            expires_at_ms: data.expires_at,
            scopes: data.scopes,
            subscription_type: data.subscription_type,
            rate_limit_tier: data.rate_limit_tier,
            source,
        })
    }

    /// Returns true if the token is expired, or expires within
    /// [`EXPIRY_BUFFER_MS`] of `now_ms`. A missing expiry counts as expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at_ms {
            Some(expires_at) => now_ms.saturating_add(EXPIRY_BUFFER_MS) > expires_at,
            None => true,
        }
    }

    /// [`Self::is_expired_at`] against the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at_ms
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Check if the credentials have a specific scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

// ============================================================================
// Credential Providers
// ============================================================================

/// Backend used for the secret-store step of the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretStore {
    /// Run an external command that prints the credentials document.
    KeychainCommand {
        /// Program name or path.
        program: String,
        /// Arguments.
        args: Vec<String>,
    },
    /// Read from the platform keyring.
    Keyring {
        /// Service name.
        service: String,
        /// Account name.
        account: String,
    },
    /// Skip the secret store.
    Disabled,
}

impl SecretStore {
    /// The lookup Claude Code's own storage needs on this platform.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::macos_keychain()
        } else {
            Self::keyring()
        }
    }

    /// `security find-generic-password -s "Claude Code-credentials" -w`.
    pub fn macos_keychain() -> Self {
        Self::KeychainCommand {
            program: "security".to_string(),
            args: vec![
                "find-generic-password".to_string(),
                "-s".to_string(),
                KEYCHAIN_SERVICE.to_string(),
                "-w".to_string(),
            ],
        }
    }

    /// Platform keyring entry for the current user.
    pub fn keyring() -> Self {
        Self::Keyring {
            service: KEYCHAIN_SERVICE.to_string(),
            account: current_username().unwrap_or_default(),
        }
    }
}

/// One step of the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialProvider {
    /// A JSON file on disk.
    File(PathBuf),
    /// A platform secret store.
    SecretStore(SecretStore),
}

impl CredentialProvider {
    /// Loads credentials from this provider.
    ///
    /// # Errors
    ///
    /// Returns the provider-specific [`CredentialError`].
    pub async fn load(
        &self,
        runner: &ProcessRunner,
        keychain: &SystemKeychain,
    ) -> Result<OAuthCredentials, CredentialError> {
        match self {
            Self::File(path) => load_from_file(path).await,
            Self::SecretStore(SecretStore::KeychainCommand { program, args }) => {
                load_from_command(runner, program, args).await
            }
            Self::SecretStore(SecretStore::Keyring { service, account }) => {
                load_from_keyring(keychain, service, account).await
            }
            Self::SecretStore(SecretStore::Disabled) => Err(CredentialError::SecretStoreDisabled),
        }
    }
}

async fn load_from_file(path: &Path) -> Result<OAuthCredentials, CredentialError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CredentialError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(CredentialError::FileNotReadable(e.to_string())),
    };

    debug!(path = %path.display(), "Read credentials file");
    OAuthCredentials::parse(&content, CredentialSource::File)
}

async fn load_from_command(
    runner: &ProcessRunner,
    program: &str,
    args: &[String],
) -> Result<OAuthCredentials, CredentialError> {
    let output = runner
        .run(program, args)
        .await
        .map_err(|e| CredentialError::SecretStoreUnavailable(e.to_string()))?;

    let secret = output
        .stdout_if_success()
        .map_err(|e| match e {
            ProcessError::NonZeroExit { code, .. } => CredentialError::SecretStoreFailed(code),
            other => CredentialError::SecretStoreUnavailable(other.to_string()),
        })?
        .trim();
    if secret.is_empty() {
        return Err(CredentialError::SecretStoreEmpty);
    }

    OAuthCredentials::parse(secret, CredentialSource::KeychainCommand)
}

async fn load_from_keyring(
    keychain: &SystemKeychain,
    service: &str,
    account: &str,
) -> Result<OAuthCredentials, CredentialError> {
    let secret = keychain
        .get(service, account)
        .await
        .map_err(|e| CredentialError::SecretStoreUnavailable(e.to_string()))?
        .ok_or(CredentialError::SecretStoreEmpty)?;

    OAuthCredentials::parse(secret.trim(), CredentialSource::Keyring)
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Credentials file location.
    pub credentials_path: PathBuf,
    /// Secret-store backend.
    pub secret_store: SecretStore,
    /// How long resolved credentials are reused.
    pub cache_ttl: Duration,
}

impl ResolverConfig {
    /// Default configuration for the current user.
    ///
    /// # Errors
    ///
    /// Returns `NoHomeDirectory` if the home directory is unknown.
    pub fn for_current_user() -> Result<Self, CredentialError> {
        Ok(Self {
            credentials_path: default_credentials_path().ok_or(CredentialError::NoHomeDirectory)?,
            secret_store: SecretStore::platform_default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        })
    }
}

/// Per-source outcome, for diagnostics.
#[derive(Debug, Clone)]
pub struct CredentialDiagnosis {
    /// The file that was checked.
    pub file_path: PathBuf,
    /// Outcome of the file source.
    pub file: Result<OAuthCredentials, CredentialError>,
    /// Outcome of the secret-store source.
    pub secret_store: Result<OAuthCredentials, CredentialError>,
}

struct CachedCredentials {
    credentials: OAuthCredentials,
    fetched_at: Instant,
}

/// Locates, parses, and caches OAuth credentials.
///
/// The cache lock is held across a resolution, so concurrent callers share
/// one file read / keychain lookup.
pub struct CredentialResolver {
    config: ResolverConfig,
    runner: ProcessRunner,
    keychain: SystemKeychain,
    cache: Mutex<Option<CachedCredentials>>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CredentialResolver {
    /// Creates a resolver.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            runner: ProcessRunner::new(),
            keychain: SystemKeychain::new(),
            cache: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The resolution chain, in order.
    pub fn chain(&self) -> [CredentialProvider; 2] {
        [
            CredentialProvider::File(self.config.credentials_path.clone()),
            CredentialProvider::SecretStore(self.config.secret_store.clone()),
        ]
    }

    /// Returns credentials, from cache if younger than the TTL.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` with both sources' reasons when neither
    /// yields credentials.
    #[instrument(skip(self))]
    pub async fn credentials(&self) -> Result<OAuthCredentials, CredentialError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.config.cache_ttl {
                trace!(source = %cached.credentials.source, "Credential cache hit");
                return Ok(cached.credentials.clone());
            }
        }

        let credentials = self.resolve().await?;
        *cache = Some(CachedCredentials {
            credentials: credentials.clone(),
            fetched_at: Instant::now(),
        });
        Ok(credentials)
    }

    /// Returns the access token, or `None` if no source yields one.
    pub async fn access_token(&self) -> Option<String> {
        match self.credentials().await {
            Ok(credentials) => Some(credentials.access_token),
            Err(e) => {
                debug!(error = %e, "No access token available");
                None
            }
        }
    }

    /// Returns true if the token is expired, about to expire, or unavailable.
    pub async fn is_expired(&self) -> bool {
        self.credentials().await.map_or(true, |c| c.is_expired())
    }

    /// Returns true if the credentials file exists (readable or not).
    pub fn credentials_file_exists(&self) -> bool {
        self.config.credentials_path.exists()
    }

    /// Drops cached credentials so the next call re-reads its sources.
    pub async fn invalidate_cache(&self) {
        *self.cache.lock().await = None;
        debug!("Credential cache invalidated");
    }

    /// Checks every source independently. Does not touch the cache.
    pub async fn diagnose(&self) -> CredentialDiagnosis {
        let [file, store] = self.chain();
        CredentialDiagnosis {
            file_path: self.config.credentials_path.clone(),
            file: file.load(&self.runner, &self.keychain).await,
            secret_store: store.load(&self.runner, &self.keychain).await,
        }
    }

    async fn resolve(&self) -> Result<OAuthCredentials, CredentialError> {
        let [file, store] = self.chain();

        let file_err = match file.load(&self.runner, &self.keychain).await {
            Ok(credentials) => {
                debug!(source = %credentials.source, "Resolved credentials");
                return Ok(credentials);
            }
            Err(e) => e,
        };
        if file_err.is_file_absent() {
            debug!("Credentials file absent, trying secret store");
        } else {
            warn!(error = %file_err, "Credentials file unusable, trying secret store");
        }

        match store.load(&self.runner, &self.keychain).await {
            Ok(credentials) => {
                debug!(source = %credentials.source, "Resolved credentials");
                Ok(credentials)
            }
            Err(store_err) => {
                debug!(error = %store_err, "Secret store lookup failed");
                Err(CredentialError::MissingCredentials {
                    file: Box::new(file_err),
                    secret_store: Box::new(store_err),
                })
            }
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Returns the path to the credentials file.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join(".credentials.json"))
}

// ============================================================================
// Tests
// ============================================================================
