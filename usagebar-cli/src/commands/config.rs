//! Config command - manage configuration.
//!
//! Runs before settings are loaded, so a broken settings file can still be
//! inspected or reset.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;
use usagebar_anthropic::credentials::default_credentials_path;
use usagebar_store::Settings;

use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write a settings file with every default spelled out.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli).await,
        ConfigAction::Init { force } => init_config(force, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&cli.settings_path()?).await?;

    match cli.format {
        OutputFormat::Text => {
            println!("usagebar configuration");
            println!("{}", "─".repeat(40));
            println!("Refresh interval:      {}s", settings.refresh_interval_secs);
            println!("Pause after failures:  {}", settings.max_consecutive_failures);
            println!("API base URL:          {}", settings.api_base_url);
            println!("Request timeout:       {}s", settings.request_timeout_secs);
            println!(
                "Retries:               {} attempts, {}ms backoff unit",
                settings.max_attempts, settings.retry_base_delay_ms
            );
            println!("Credential cache TTL:  {}s", settings.credential_cache_ttl_secs);
            println!("Secret store:          {}", settings.secret_store);
            println!("Log level:             {}", settings.log_level);
            if let Some(path) = &settings.credentials_path {
                println!("Credentials file:      {}", path.display());
            }
        }
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&settings)?),
    }

    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let settings_path = cli.settings_path()?;
    let credentials_path = match Settings::load(&settings_path).await {
        Ok(settings) => settings.resolver_config()?.credentials_path,
        // A broken settings file should not hide where things live.
        Err(_) => default_credentials_path().unwrap_or_default(),
    };

    match cli.format {
        OutputFormat::Text => {
            println!("Settings file:    {}", settings_path.display());
            println!("Credentials file: {}", credentials_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "settingsFile": settings_path.display().to_string(),
                "credentialsFile": credentials_path.display().to_string(),
            });
            println!("{}", cli.json_formatter().format(&paths)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = cli.settings_path()?;
    if tokio::fs::try_exists(&path).await? && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Settings::default().save(&path).await?;
    info!(path = %path.display(), "Settings initialized");
    println!("Wrote defaults to {}", path.display());

    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let path = cli.settings_path()?;

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            info!(path = %path.display(), "Settings reset");
            println!("Configuration reset to defaults");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No configuration file to reset");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
