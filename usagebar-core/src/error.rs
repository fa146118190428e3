//! Core error types for `usagebar`.

use thiserror::Error;

/// Core error type for model validation and conversion.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid data from an API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
