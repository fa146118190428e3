//! Store error types.

use thiserror::Error;

/// Errors raised while loading, validating or saving settings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A setting holds an unusable value.
    #[error("Invalid setting `{field}`: {reason}")]
    InvalidSetting {
        /// Setting name as it appears in the file.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// No platform configuration directory.
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// The API client or credential resolver rejected the derived config.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the settings file is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
