//! Read access to the system keychain.
//!
//! This module provides access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)
//!
//! `keyring` is synchronous and may block on an unlock prompt, so every
//! lookup runs on the blocking pool.

use keyring::Entry;
use tracing::{debug, warn};

use crate::error::KeychainError;

/// Default implementation using the system keychain.
#[derive(Debug, Clone, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }

    /// Reads a secret.
    ///
    /// # Returns
    /// * `Ok(Some(secret))` - Credential found
    /// * `Ok(None)` - No entry, or the entry is empty
    /// * `Err(e)` - The keychain could not be queried
    ///
    /// # Errors
    ///
    /// Returns a [`KeychainError`] when the platform store is unreachable.
    pub async fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError> {
        debug!(service = %service, account = %account, "Getting credential from keychain");

        let service = service.to_string();
        let account = account.to_string();
        tokio::task::spawn_blocking(move || read_entry(&service, &account))
            .await
            .map_err(|e| KeychainError::Other(format!("keychain lookup task failed: {e}")))?
    }
}

fn read_entry(service: &str, account: &str) -> Result<Option<String>, KeychainError> {
    let entry = Entry::new(service, account).map_err(|e| {
        warn!(service = %service, error = %e, "Failed to create keychain entry");
        KeychainError::from(e)
    })?;

    match entry.get_password() {
        Ok(secret) if !secret.trim().is_empty() => {
            debug!(service = %service, "Credential found");
            Ok(Some(secret))
        }
        Ok(_) | Err(keyring::Error::NoEntry) => {
            debug!(service = %service, "Credential not found");
            Ok(None)
        }
        Err(e) => {
            warn!(service = %service, error = %e, "Failed to get credential");
            Err(e.into())
        }
    }
}

/// Returns the login name used as the keychain account, if known.
pub fn current_username() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyring_error_mapping() {
        let err = KeychainError::from(keyring::Error::Invalid(
            "service".to_string(),
            "empty".to_string(),
        ));
        assert!(matches!(err, KeychainError::Other(_)));
    }

    // Actual keychain reads require platform access and are not exercised
    // in unit tests.
}
