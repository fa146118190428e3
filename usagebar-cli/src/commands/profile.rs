//! Profile command - show account and organization.

use anyhow::Result;
use usagebar_store::Settings;

use super::build_client;
use crate::{Cli, OutputFormat};

/// Runs the profile command.
pub async fn run(settings: &Settings, cli: &Cli) -> Result<()> {
    let profile = build_client(settings)?.fetch_profile().await?;

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_profile(&profile)),
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&profile)?),
    }

    Ok(())
}
