//! Usage-related types.
//!
//! The usage endpoint reports one entry per rolling quota window. Windows the
//! account does not have (e.g. Opus on a Pro plan) are `null` or absent on the
//! wire and decode to `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Usage Snapshot
// ============================================================================

/// Quota utilization across all rolling windows, as of one fetch.
///
/// Wire field names are snake_case (`five_hour`, `seven_day`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Rolling 5-hour session window.
    #[serde(default)]
    pub five_hour: Option<UsageLimit>,
    /// Rolling 7-day window across all models.
    #[serde(default)]
    pub seven_day: Option<UsageLimit>,
    /// Rolling 7-day window for Sonnet.
    #[serde(default)]
    pub seven_day_sonnet: Option<UsageLimit>,
    /// Rolling 7-day window for Opus.
    #[serde(default)]
    pub seven_day_opus: Option<UsageLimit>,
    /// Rolling 7-day window for third-party OAuth apps.
    #[serde(default)]
    pub seven_day_oauth_apps: Option<UsageLimit>,
}

impl UsageSnapshot {
    /// Returns the present windows with their display labels, in display order.
    pub fn windows(&self) -> impl Iterator<Item = (&'static str, &UsageLimit)> {
        [
            ("Session (5h)", self.five_hour.as_ref()),
            ("Weekly", self.seven_day.as_ref()),
            ("Weekly Sonnet", self.seven_day_sonnet.as_ref()),
            ("Weekly Opus", self.seven_day_opus.as_ref()),
            ("Weekly OAuth apps", self.seven_day_oauth_apps.as_ref()),
        ]
        .into_iter()
        .filter_map(|(label, limit)| limit.map(|l| (label, l)))
    }

    /// Returns the highest utilization across all present windows.
    pub fn max_utilization(&self) -> Option<f64> {
        self.windows()
            .map(|(_, l)| l.utilization_percent)
            .reduce(f64::max)
    }

    /// Returns true if any window data is present.
    pub fn has_data(&self) -> bool {
        self.windows().next().is_some()
    }

    /// Validates the snapshot data.
    ///
    /// Out-of-range utilization (above 100 on over-consumption, or slightly
    /// negative) is kept as sent and clamped for display. Only non-finite
    /// values are rejected.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` naming the first offending window.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (label, limit) in self.windows() {
            limit
                .validate()
                .map_err(|e| CoreError::InvalidData(format!("{label} window: {e}")))?;
        }
        Ok(())
    }
}

// ============================================================================
// Usage Limit
// ============================================================================

/// A single quota window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLimit {
    /// Percentage of the window consumed. Nominally 0-100.
    #[serde(rename = "utilization")]
    pub utilization_percent: f64,
    /// When the window resets, exactly as the server sent it.
    #[serde(default)]
    pub resets_at: Option<String>,
}

impl UsageLimit {
    /// Creates a new window.
    pub fn new(utilization_percent: f64, resets_at: impl Into<String>) -> Self {
        Self {
            utilization_percent,
            resets_at: Some(resets_at.into()),
        }
    }

    /// Returns the remaining percentage, clamped to `[0, 100]`.
    pub fn remaining_percent(&self) -> f64 {
        (100.0 - self.utilization_percent).clamp(0.0, 100.0)
    }

    /// Parses the reset timestamp as RFC 3339.
    pub fn resets_at_utc(&self) -> Option<DateTime<Utc>> {
        self.resets_at.as_deref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Returns true if the window is at or beyond its quota.
    pub fn is_exhausted(&self) -> bool {
        self.utilization_percent >= 100.0
    }

    fn validate(&self) -> Result<(), String> {
        if !self.utilization_percent.is_finite() {
            return Err(format!(
                "utilization is not finite: {}",
                self.utilization_percent
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
