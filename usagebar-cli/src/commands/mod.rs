//! CLI command implementations.

pub mod auth;
pub mod config;
pub mod profile;
pub mod usage;
pub mod watch;

use anyhow::Result;
use std::sync::Arc;
use usagebar_anthropic::{ApiClient, CredentialResolver};
use usagebar_store::Settings;

/// Builds an API client wired to a fresh credential resolver.
pub fn build_client(settings: &Settings) -> Result<ApiClient> {
    let resolver = Arc::new(CredentialResolver::new(settings.resolver_config()?));
    Ok(ApiClient::new(settings.api_config(), resolver)?)
}
