//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local, Utc};
use usagebar_anthropic::{CredentialDiagnosis, CredentialError, OAuthCredentials};
use usagebar_core::{ErrorState, ProfileSnapshot, UsageLimit, UsageSnapshot};
use usagebar_store::DashboardState;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Width of the label column.
const LABEL_WIDTH: usize = 19;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Formats every present quota window.
    pub fn format_usage(&self, usage: &UsageSnapshot) -> String {
        if !usage.has_data() {
            return self.dim("No usage data reported");
        }

        usage
            .windows()
            .map(|(label, limit)| self.format_window(limit, label, Utc::now()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats a quota window with progress bar and reset time.
    pub fn format_window(&self, limit: &UsageLimit, label: &str, now: DateTime<Utc>) -> String {
        let remaining = limit.remaining_percent();
        let bar = self.progress_bar(remaining);
        let pct = self.color_for_percent(remaining, &format!("{remaining:.0}% left"));

        let mut result = format!("{:<LABEL_WIDTH$} {bar} {pct}", format!("{label}:"));
        if limit.is_exhausted() {
            result.push_str(&format!(" {}", self.red("(limit reached)")));
        }

        match (limit.resets_at_utc(), limit.resets_at.as_deref()) {
            (Some(resets_at), _) => {
                let when = format_reset_time(resets_at, now);
                result.push_str(&format!("\n{:LABEL_WIDTH$} Resets {}", "", self.dim(&when)));
            }
            // Unparseable timestamps are shown verbatim.
            (None, Some(raw)) => {
                result.push_str(&format!("\n{:LABEL_WIDTH$} Resets {}", "", self.dim(raw)));
            }
            (None, None) => {}
        }

        result
    }

    /// Formats account and organization details.
    pub fn format_profile(&self, profile: &ProfileSnapshot) -> String {
        let mut lines = Vec::new();

        if let Some(account) = &profile.account {
            if let Some(name) = profile.display_name() {
                lines.push(format!("Account: {}", self.cyan(name)));
            }
            if let Some(email) = account.email.as_deref().filter(|e| Some(*e) != profile.display_name()) {
                lines.push(format!("Email:   {email}"));
            }
            lines.push(format!("Plan:    {}", self.blue(account.plan_label())));
        }

        if let Some(org) = &profile.organization {
            if let Some(name) = &org.name {
                lines.push(format!("Org:     {name}"));
            }
            if let Some(tier) = &org.rate_limit_tier {
                lines.push(format!("Tier:    {}", self.dim(tier)));
            }
        }

        if lines.is_empty() {
            return self.dim("No profile data reported");
        }
        lines.join("\n")
    }

    /// Formats usage and profile together, as printed by the one-shot command.
    pub fn format_report(&self, usage: &UsageSnapshot, profile: &ProfileSnapshot) -> String {
        format!(
            "{}\n{}\n\n{}",
            self.bold("Claude usage"),
            self.format_usage(usage),
            self.format_profile(profile)
        )
    }

    /// Formats the live dashboard.
    pub fn format_dashboard(&self, state: &DashboardState) -> String {
        let mut lines = vec![self.bold("Claude usage")];

        match &state.usage {
            Some(usage) => lines.push(self.format_usage(usage)),
            None if state.is_loading => lines.push(self.dim("Loading...")),
            None => lines.push(self.dim("No data yet")),
        }

        if let Some(profile) = &state.profile {
            lines.push(String::new());
            lines.push(self.format_profile(profile));
        }

        if let Some(error) = &state.error {
            lines.push(String::new());
            lines.push(self.format_error(error));
        }

        lines.push(String::new());
        lines.push(self.dim(&status_line(state)));
        lines.push(self.dim(if state.auto_refresh_active {
            "[r] refresh  [q] quit"
        } else {
            "[r] refresh  [resume] restart auto-refresh  [q] quit"
        }));

        lines.join("\n")
    }

    // ========================================================================
    // Errors and diagnostics
    // ========================================================================

    /// Formats an error message with its hint.
    pub fn format_error(&self, error: &ErrorState) -> String {
        let mut line = format!("{}: {}", self.red(error.category.label()), error.message);
        if let Some(hint) = &error.action_hint {
            line.push_str(&format!("\n  {}", self.yellow(hint)));
        }
        line
    }

    /// Formats the per-source credential report.
    pub fn format_diagnosis(&self, diagnosis: &CredentialDiagnosis) -> String {
        let file_label = format!("File ({})", diagnosis.file_path.display());
        [
            self.bold("Credential sources"),
            self.format_source(&file_label, &diagnosis.file),
            self.format_source("Secret store", &diagnosis.secret_store),
        ]
        .join("\n")
    }

    fn format_source(
        &self,
        label: &str,
        outcome: &Result<OAuthCredentials, CredentialError>,
    ) -> String {
        match outcome {
            Ok(credentials) => {
                let expiry = match credentials.expires_at() {
                    Some(at) if credentials.is_expired() => {
                        self.yellow(&format!("expired or expiring (at {})", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")))
                    }
                    Some(at) => format!("valid until {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
                    None => self.yellow("no expiry recorded"),
                };
                let plan = credentials
                    .subscription_type
                    .as_deref()
                    .map(|p| format!(", plan {p}"))
                    .unwrap_or_default();
                format!("  {} {label}: {expiry}{plan}", self.green("✓"))
            }
            Err(e) => format!("  {} {label}: {}", self.red("✗"), self.dim(&e.to_string())),
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    /// Formats a progress bar.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        let fraction = (percent_remaining / 100.0).clamp(0.0, 1.0);
        let filled = (fraction * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar: String = std::iter::repeat_n(BAR_FULL, filled)
            .chain(std::iter::repeat_n(BAR_EMPTY, empty))
            .collect();

        self.color_for_percent(percent_remaining, &bar)
    }

    pub(crate) fn color_for_percent(&self, percent: f64, text: &str) -> String {
        let color = if percent < 20.0 {
            RED
        } else if percent < 50.0 {
            YELLOW
        } else {
            GREEN
        };
        self.paint(color, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn blue(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Countdown under a day, otherwise a local day and time.
pub(crate) fn format_reset_time(resets_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if resets_at <= now {
        return "now".to_string();
    }

    let diff = resets_at - now;
    if diff < Duration::hours(1) {
        let mins = diff.num_minutes().max(1);
        return format!("in {mins} minute{}", if mins == 1 { "" } else { "s" });
    }
    if diff < Duration::hours(24) {
        let hours = diff.num_hours();
        let mins = diff.num_minutes() % 60;
        return if mins > 0 {
            format!("in {hours}h {mins}m")
        } else {
            format!("in {hours} hour{}", if hours == 1 { "" } else { "s" })
        };
    }

    let local_reset = resets_at.with_timezone(&Local);
    let today = now.with_timezone(&Local).date_naive();
    let time = local_reset.format("%l:%M %p").to_string();
    if local_reset.date_naive() == today + chrono::Days::new(1) {
        format!("tomorrow at {}", time.trim())
    } else {
        format!("{} at {}", local_reset.format("%a %b %e"), time.trim())
    }
}

fn status_line(state: &DashboardState) -> String {
    let updated = state.last_updated.map_or_else(
        || "never updated".to_string(),
        |at| format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S")),
    );

    let mut parts = vec![updated];
    if state.is_loading {
        parts.push("refreshing".to_string());
    }
    if !state.auto_refresh_active {
        parts.push("auto-refresh paused".to_string());
    }
    if state.consecutive_failures > 0 {
        parts.push(format!("{} failed in a row", state.consecutive_failures));
    }
    parts.join(" · ")
}
