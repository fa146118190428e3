// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! usagebar CLI - Claude subscription quota monitoring from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Show usage and profile once
//! usagebar
//!
//! # JSON output
//! usagebar --format json --pretty
//!
//! # Keep polling, re-rendering on every change
//! usagebar watch --interval 60
//!
//! # Where do my credentials come from?
//! usagebar auth status
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use usagebar_anthropic::ApiError;
use usagebar_core::{ErrorCategory, ErrorState};
use usagebar_store::{LogLevel, Settings, StoreError, default_settings_path};

use commands::{auth, config, profile, usage, watch};
use output::{ErrorOutput, JsonFormatter, TextFormatter};

// ============================================================================
// CLI Definition
// ============================================================================

/// usagebar CLI - Claude subscription quota monitoring.
#[derive(Parser)]
#[command(name = "usagebar")]
#[command(about = "Claude subscription quota monitoring CLI")]
#[command(long_about = r#"
usagebar shows how much of your Claude subscription quota is used.

It reads the OAuth credentials Claude Code stores after `claude login`
(~/.claude/.credentials.json, or the macOS keychain) and queries the
Anthropic usage endpoints.

Examples:
  usagebar                      # Usage and profile, once
  usagebar --format json        # JSON output
  usagebar watch                # Poll every 30 seconds
  usagebar auth status          # Credential diagnostics
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true, env = "USAGEBAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, errors only as exit codes).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Text formatter honoring `--no-color`.
    pub fn text_formatter(&self) -> TextFormatter {
        TextFormatter::new(!self.no_color)
    }

    /// JSON formatter honoring `--pretty`.
    pub fn json_formatter(&self) -> JsonFormatter {
        JsonFormatter::new(self.pretty)
    }

    /// Settings file in effect.
    pub fn settings_path(&self) -> Result<PathBuf> {
        self.config
            .clone()
            .or_else(default_settings_path)
            .ok_or_else(|| StoreError::NoConfigDir.into())
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch current usage (default if no command specified).
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Show account and organization.
    #[command(visible_alias = "p")]
    Profile,

    /// Keep polling and re-render on every change.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Inspect or exercise credentials.
    Auth(auth::AuthArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes for failures. Success exits with 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// Missing, expired or rejected credentials.
    Authentication = 2,
    /// Network or server failure.
    Network = 3,
}

impl ExitCode {
    /// Exit code for a failure category.
    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Authentication => ExitCode::Authentication,
            ErrorCategory::Network | ErrorCategory::Server => ExitCode::Network,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("usagebar=debug,info")
        } else {
            EnvFilter::new(format!("usagebar={level},warn"))
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging needs the configured level, and loading settings may log.
    let settings = match cli.settings_path() {
        Ok(path) => Settings::load(&path).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    let level = settings.as_ref().map_or(LogLevel::default(), |s| s.log_level);
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match &cli.command {
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        command => match settings {
            Ok(settings) => run_command(command.as_ref(), &settings, &cli).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        let code = report_error(&e, &cli);
        std::process::exit(code as i32);
    }
}

async fn run_command(command: Option<&Commands>, settings: &Settings, cli: &Cli) -> Result<()> {
    match command {
        Some(Commands::Usage(args)) => usage::run(args, settings, cli).await,
        Some(Commands::Profile) => profile::run(settings, cli).await,
        Some(Commands::Watch(args)) => watch::run(args, settings, cli).await,
        Some(Commands::Auth(args)) => auth::run(args, settings, cli).await,
        Some(Commands::Config(args)) => config::run(args, cli).await,
        None => usage::run(&usage::UsageArgs::default(), settings, cli).await,
    }
}

/// Prints the failure and picks the exit code.
fn report_error(err: &anyhow::Error, cli: &Cli) -> ExitCode {
    let state = err.downcast_ref::<ApiError>().and_then(ApiError::to_error_state);
    let code = state
        .as_ref()
        .map_or(ExitCode::Error, |s| ExitCode::from_category(s.category));

    error!(error = %err, exit_code = code as i32, "Command failed");
    if cli.quiet {
        return code;
    }

    let state = state.unwrap_or_else(|| {
        ErrorState::new(ErrorCategory::Unknown, format!("{err:#}"), false, None)
    });
    match cli.format {
        OutputFormat::Text => eprintln!("{}", cli.text_formatter().format_error(&state)),
        OutputFormat::Json => match cli.json_formatter().format(&ErrorOutput::from(&state)) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error: {state}"),
        },
    }
    code
}
