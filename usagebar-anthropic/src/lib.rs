// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # usagebar Anthropic
//!
//! Talks to the Anthropic OAuth endpoints on behalf of a logged-in Claude
//! Code user.
//!
//! - [`credentials`] - Finds and caches the OAuth token Claude Code stored
//!   (credentials file first, then the platform secret store)
//! - [`api`] - Authenticated usage/profile fetches with retry, plus the
//!   token refresh exchange
//! - [`error`] - [`ApiError`] classification and its mapping to
//!   [`usagebar_core::ErrorState`]
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use usagebar_anthropic::{ApiClient, ApiConfig, CredentialResolver, ResolverConfig};
//!
//! let resolver = Arc::new(CredentialResolver::new(ResolverConfig::for_current_user()?));
//! let client = ApiClient::new(ApiConfig::default(), resolver)?;
//! let usage = client.fetch_usage().await?;
//! ```

pub mod api;
pub mod credentials;
pub mod error;

pub use api::{ApiClient, ApiConfig, TokenRefresh, UsageApi};
pub use credentials::{
    CredentialDiagnosis, CredentialProvider, CredentialResolver, CredentialSource,
    OAuthCredentials, ResolverConfig, SecretStore,
};
pub use error::{ApiError, CredentialError};
