//! Host APIs for usagebar.
//!
//! This module provides abstractions for interacting with external systems:
//!
//! - [`keychain`] - Secure credential storage (system keychain)
//! - [`http`] - HTTP client with tracing and failure classification
//! - [`process`] - Subprocess execution for lookup commands

pub mod http;
pub mod keychain;
pub mod process;

// Re-export key types
pub use http::{HttpClient, HttpClientBuilder, TransportFailure};
pub use keychain::SystemKeychain;
pub use process::{ProcessOutput, ProcessRunner};
