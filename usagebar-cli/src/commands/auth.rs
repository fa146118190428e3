//! Auth command - inspect and exercise credentials.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::{info, warn};
use usagebar_anthropic::{ApiError, CredentialDiagnosis};
use usagebar_store::Settings;

use super::build_client;
use crate::output::AuthStatusOutput;
use crate::{Cli, OutputFormat};

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Check every credential source.
    Status,

    /// Exchange the refresh token for a new access token.
    Refresh,
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, settings: &Settings, cli: &Cli) -> Result<()> {
    match args.action {
        AuthAction::Status => status(settings, cli).await,
        AuthAction::Refresh => refresh(settings, cli).await,
    }
}

async fn status(settings: &Settings, cli: &Cli) -> Result<()> {
    let client = build_client(settings)?;
    let diagnosis = client.credentials().diagnose().await;

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_diagnosis(&diagnosis)),
        OutputFormat::Json => {
            println!("{}", cli.json_formatter().format(&AuthStatusOutput::from(&diagnosis))?);
        }
    }

    match usable_source_error(&diagnosis) {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// The failure to report when no source yields credentials.
fn usable_source_error(diagnosis: &CredentialDiagnosis) -> Option<ApiError> {
    if diagnosis.file.is_ok() || diagnosis.secret_store.is_ok() {
        return None;
    }
    match &diagnosis.file {
        Err(e) if !e.is_file_absent() => Some(ApiError::CredentialsCorrupted),
        _ => Some(ApiError::NoToken),
    }
}

async fn refresh(settings: &Settings, cli: &Cli) -> Result<()> {
    let client = build_client(settings)?;
    let refreshed = client.refresh_access_token().await?;
    info!(expires_in = ?refreshed.expires_in, "Token refreshed");
    // The credential owner persists tokens; we only prove the exchange works.
    warn!("The new token is not written back to the credential store");

    match cli.format {
        OutputFormat::Text => {
            let expiry = refreshed.expires_in.map_or_else(
                || "unknown lifetime".to_string(),
                |d| format!("valid for {} minutes", d.as_secs() / 60),
            );
            println!("Token refresh succeeded ({expiry}).");
            println!("Start Claude to store the new token.");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "refreshed": true,
                "expiresInSecs": refreshed.expires_in.map(|d| d.as_secs()),
                "rotatedRefreshToken": refreshed.refresh_token.is_some(),
            });
            println!("{}", cli.json_formatter().format(&output)?);
        }
    }

    Ok(())
}
