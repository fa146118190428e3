//! Usage command - fetch quota utilization once.

use anyhow::Result;
use clap::Args;
use tracing::{debug, info};
use usagebar_store::Settings;

use super::build_client;
use crate::output::UsageReport;
use crate::{Cli, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Skip the profile request.
    #[arg(long)]
    pub no_profile: bool,
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, settings: &Settings, cli: &Cli) -> Result<()> {
    let client = build_client(settings)?;
    info!(profile = !args.no_profile, "Fetching usage");

    let (usage, profile) = if args.no_profile {
        (client.fetch_usage().await?, None)
    } else {
        let (usage, profile) = tokio::try_join!(client.fetch_usage(), client.fetch_profile())?;
        (usage, Some(profile))
    };
    debug!(max = ?usage.max_utilization(), "Usage fetched");

    match cli.format {
        OutputFormat::Text => {
            let formatter = cli.text_formatter();
            match &profile {
                Some(profile) => println!("{}", formatter.format_report(&usage, profile)),
                None => println!("{}", formatter.format_usage(&usage)),
            }
        }
        OutputFormat::Json => {
            let report = UsageReport::new(&usage, profile.as_ref());
            println!("{}", cli.json_formatter().format(&report)?);
        }
    }

    Ok(())
}
