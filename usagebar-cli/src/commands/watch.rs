//! Watch command - real-time usage monitoring.
//!
//! Drives a [`RefreshOrchestrator`] and re-renders whenever its state
//! changes. Lines typed on stdin control it: `r` refreshes, `p` pauses,
//! `resume` restarts auto-refresh, `c` cancels an in-flight refresh and
//! `q` quits.

use anyhow::Result;
use clap::Args;
use std::io::{Write, stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use usagebar_store::{DashboardState, MAX_REFRESH_INTERVAL_SECS, RefreshOrchestrator, Settings};

use super::build_client;
use crate::output::{DashboardOutput, JsonFormatter};
use crate::{Cli, OutputFormat};

/// Shortest accepted polling interval.
const MIN_INTERVAL_SECS: u64 = 10;

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds (defaults to the configured interval).
    #[arg(long, short)]
    pub interval: Option<u64>,
}

/// A line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKey {
    /// Refresh now.
    Refresh,
    /// Stop auto-refresh.
    Pause,
    /// Restart auto-refresh.
    Resume,
    /// Abandon the in-flight refresh.
    Cancel,
    /// Leave watch mode.
    Quit,
}

impl WatchKey {
    /// Parses one input line. Unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "refresh" => Some(Self::Refresh),
            "p" | "pause" => Some(Self::Pause),
            "resume" => Some(Self::Resume),
            "c" | "cancel" => Some(Self::Cancel),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, settings: &Settings, cli: &Cli) -> Result<()> {
    let mut polling = settings.polling_config();
    if let Some(secs) = args.interval {
        polling.interval = Duration::from_secs(clamp_interval(secs));
    }
    info!(interval = ?polling.interval, "Starting watch mode");

    let orchestrator = RefreshOrchestrator::new(Arc::new(build_client(settings)?), polling);
    let mut rx = orchestrator.subscribe();

    let starter = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        starter.start().await;
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let initial = rx.borrow_and_update().clone();
    render(&initial, cli)?;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                render(&state, cli)?;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match WatchKey::parse(&line) {
                    Some(WatchKey::Quit) => break,
                    Some(key) => handle_key(&orchestrator, key),
                    None => debug!(input = %line.trim(), "Ignoring unknown input"),
                },
                // Piped or closed stdin: keep polling until Ctrl-C.
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    orchestrator.shutdown();
    info!("Watch mode stopped");
    Ok(())
}

/// Keeps a requested interval within what the orchestrator accepts.
fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS)
}

fn handle_key(orchestrator: &Arc<RefreshOrchestrator>, key: WatchKey) {
    debug!(?key, "Watch input");
    match key {
        WatchKey::Refresh => {
            let this = Arc::clone(orchestrator);
            tokio::spawn(async move {
                this.refresh().await;
            });
        }
        WatchKey::Resume => {
            let this = Arc::clone(orchestrator);
            tokio::spawn(async move {
                this.resume_auto_refresh().await;
            });
        }
        WatchKey::Pause => orchestrator.pause_auto_refresh(),
        WatchKey::Cancel => orchestrator.cancel_in_flight(),
        WatchKey::Quit => {}
    }
}

fn render(state: &DashboardState, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let mut out = stdout().lock();
            // Clear screen
            write!(out, "\x1b[2J\x1b[H")?;
            writeln!(out, "{}", cli.text_formatter().format_dashboard(state))?;
            out.flush()?;
        }
        // One JSON document per line.
        OutputFormat::Json => {
            let json = JsonFormatter::new(false).format(&DashboardOutput::from(state))?;
            println!("{json}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(WatchKey::parse("r"), Some(WatchKey::Refresh));
        assert_eq!(WatchKey::parse("  Refresh \n"), Some(WatchKey::Refresh));
        assert_eq!(WatchKey::parse("p"), Some(WatchKey::Pause));
        assert_eq!(WatchKey::parse("resume"), Some(WatchKey::Resume));
        assert_eq!(WatchKey::parse("c"), Some(WatchKey::Cancel));
        assert_eq!(WatchKey::parse("q"), Some(WatchKey::Quit));
        assert_eq!(WatchKey::parse("exit"), Some(WatchKey::Quit));
        assert_eq!(WatchKey::parse(""), None);
        assert_eq!(WatchKey::parse("x"), None);
    }

    #[test]
    fn test_interval_is_clamped() {
        assert_eq!(clamp_interval(1), MIN_INTERVAL_SECS);
        assert_eq!(clamp_interval(60), 60);
        assert_eq!(clamp_interval(u64::MAX), MAX_REFRESH_INTERVAL_SECS);
    }
}
