// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # usagebar Fetch
//!
//! Host APIs shared by the usagebar API client and credential resolver.
//!
//! ## Host APIs
//!
//! The [`host`] module provides abstractions for system interactions:
//!
//! - [`host::keychain`] - Secure credential storage (system keychain)
//! - [`host::http`] - HTTP client with tracing and transport-failure classification
//! - [`host::process`] - Subprocess execution for lookup commands
//!
//! ## Retry
//!
//! - [`retry::RetryPolicy`] - Attempt budget with linear backoff
//!
//! ## Example
//!
//! ```ignore
//! use usagebar_fetch::{HttpClient, RetryPolicy};
//!
//! let client = HttpClient::builder().timeout(Duration::from_secs(30)).build()?;
//! let response = RetryPolicy::default()
//!     .run(|_| client.get(&url, HeaderMap::new()), |e| e.is_connect())
//!     .await?;
//! ```

pub mod error;
pub mod host;
pub mod retry;

// Errors
pub use error::{HttpError, KeychainError, ProcessError};

// Host APIs
pub use host::{
    http::{HttpClient, HttpClientBuilder, TransportFailure, join_url},
    keychain::SystemKeychain,
    process::{ProcessOutput, ProcessRunner},
};

// Retry
pub use retry::RetryPolicy;
