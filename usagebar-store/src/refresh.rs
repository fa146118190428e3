//! Refresh orchestration.
//!
//! The [`RefreshOrchestrator`] is the only writer of [`DashboardState`]. It
//! runs one refresh at a time (usage and profile fetched concurrently), drives
//! the polling timer, and pauses polling after too many failures in a row.
//! Readers subscribe to a `watch` channel and always see whole snapshots.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use usagebar_anthropic::{ApiError, UsageApi};
use usagebar_core::{ErrorCategory, ErrorState, ProfileSnapshot, UsageSnapshot};

// ============================================================================
// Configuration
// ============================================================================

/// Polling behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between automatic refreshes.
    pub interval: Duration,
    /// Failed refreshes in a row that pause automatic refresh.
    pub max_consecutive_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_consecutive_failures: 5,
        }
    }
}

// ============================================================================
// Published State
// ============================================================================

/// Everything a presentation layer needs, replaced atomically.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Latest usage, from the last successful refresh.
    pub usage: Option<Arc<UsageSnapshot>>,
    /// Latest profile, from the last successful refresh.
    pub profile: Option<Arc<ProfileSnapshot>>,
    /// Outcome of the last failed refresh; cleared on success.
    pub error: Option<ErrorState>,
    /// True while a refresh is in flight.
    pub is_loading: bool,
    /// Failed refreshes since the last success (or resume).
    pub consecutive_failures: u32,
    /// True while the polling timer runs.
    pub auto_refresh_active: bool,
    /// When the snapshots were last replaced.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Result of one [`RefreshOrchestrator::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Both snapshots were replaced.
    Updated,
    /// The refresh failed; the error state was replaced.
    Failed(ErrorCategory),
    /// The refresh was abandoned; nothing changed.
    Cancelled,
    /// Another refresh was already in flight.
    Skipped,
}

/// Clears `is_loading` however the refresh ends, including when its future
/// is dropped.
struct LoadingGuard<'a>(&'a watch::Sender<DashboardState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| std::mem::replace(&mut s.is_loading, false));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns polling cadence, the overlap guard and failure counting.
pub struct RefreshOrchestrator {
    api: Arc<dyn UsageApi>,
    config: PollingConfig,
    state: watch::Sender<DashboardState>,
    shutdown: CancellationToken,
    in_flight: Mutex<CancellationToken>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RefreshOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl RefreshOrchestrator {
    /// Creates an idle orchestrator. Nothing is fetched until [`Self::start`]
    /// or [`Self::refresh`].
    pub fn new(api: Arc<dyn UsageApi>, config: PollingConfig) -> Arc<Self> {
        let (state, _) = watch::channel(DashboardState::default());
        let shutdown = CancellationToken::new();
        Arc::new(Self {
            api,
            config,
            state,
            in_flight: Mutex::new(shutdown.child_token()),
            shutdown,
            timer: Mutex::new(None),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> PollingConfig {
        self.config
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Starts the polling timer and performs the initial refresh.
    pub async fn start(self: &Arc<Self>) -> RefreshOutcome {
        info!(interval = ?self.config.interval, "Starting auto-refresh");
        self.spawn_timer();
        self.refresh().await
    }

    /// Stops the polling timer. An in-flight refresh is not affected.
    pub fn pause_auto_refresh(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
        self.state.send_if_modified(|s| std::mem::replace(&mut s.auto_refresh_active, false));
    }

    /// Resets the failure counter, restarts the timer and refreshes once.
    pub async fn resume_auto_refresh(self: &Arc<Self>) -> RefreshOutcome {
        info!("Resuming auto-refresh");
        self.state.send_modify(|s| s.consecutive_failures = 0);
        self.spawn_timer();
        self.refresh().await
    }

    /// Abandons the in-flight refresh, if any. Later refreshes are unaffected.
    pub fn cancel_in_flight(&self) {
        let mut token = lock(&self.in_flight);
        token.cancel();
        *token = self.shutdown.child_token();
    }

    /// Stops polling and cancels the current and every later refresh.
    pub fn shutdown(&self) {
        info!("Shutting down refresh orchestrator");
        self.shutdown.cancel();
        self.pause_auto_refresh();
    }

    fn spawn_timer(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let mut timer = lock(&self.timer);
        if timer.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let period = self.config.interval;
        let Some(first_tick) = Instant::now().checked_add(period) else {
            warn!(interval = ?period, "Polling interval out of range, auto-refresh not started");
            return;
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(this) = weak.upgrade() else { break };
                debug!("Auto-refresh tick");
                tokio::spawn(async move {
                    this.refresh().await;
                });
            }
        }));
        drop(timer);

        self.state.send_if_modified(|s| !std::mem::replace(&mut s.auto_refresh_active, true));
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Fetches usage and profile concurrently and publishes the result.
    ///
    /// A no-op returning [`RefreshOutcome::Skipped`] while another refresh is
    /// in flight. Never fails: errors are recorded in the state.
    pub async fn refresh(&self) -> RefreshOutcome {
        let started = self.state.send_if_modified(|s| !std::mem::replace(&mut s.is_loading, true));
        if !started {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }
        let _loading = LoadingGuard(&self.state);

        let token = lock(&self.in_flight).clone();
        let result = tokio::select! {
            biased;
            () = token.cancelled() => Err(ApiError::Cancelled),
            (usage, profile) = async { tokio::join!(self.api.fetch_usage(), self.api.fetch_profile()) } => {
                combine(usage, profile)
            }
        };

        self.publish(result)
    }

    fn publish(&self, result: Result<(UsageSnapshot, ProfileSnapshot), ApiError>) -> RefreshOutcome {
        let error = match result {
            Ok((usage, profile)) => {
                self.state.send_modify(|s| {
                    s.usage = Some(Arc::new(usage));
                    s.profile = Some(Arc::new(profile));
                    s.error = None;
                    s.consecutive_failures = 0;
                    s.last_updated = Some(Utc::now());
                    s.is_loading = false;
                });
                info!("Refresh succeeded");
                return RefreshOutcome::Updated;
            }
            Err(e) => e,
        };

        let Some(error_state) = error.to_error_state() else {
            debug!("Refresh cancelled");
            return RefreshOutcome::Cancelled;
        };

        let category = error_state.category;
        let threshold = self.config.max_consecutive_failures;
        let mut failures = 0;
        self.state.send_modify(|s| {
            s.error = Some(error_state);
            s.consecutive_failures += 1;
            s.is_loading = false;
            failures = s.consecutive_failures;
        });
        warn!(error = %error, category = %category, failures, "Refresh failed");

        if failures >= threshold && self.state.borrow().auto_refresh_active {
            warn!(failures, "Too many consecutive failures, pausing auto-refresh");
            self.pause_auto_refresh();
        }

        RefreshOutcome::Failed(category)
    }
}

impl Drop for RefreshOrchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

/// Both fetches must succeed. Cancellation of either wins over any error;
/// otherwise the usage error is reported before the profile error.
fn combine(
    usage: Result<UsageSnapshot, ApiError>,
    profile: Result<ProfileSnapshot, ApiError>,
) -> Result<(UsageSnapshot, ProfileSnapshot), ApiError> {
    match (usage, profile) {
        (Ok(usage), Ok(profile)) => Ok((usage, profile)),
        (Err(e), _) | (_, Err(e)) if e.is_cancelled() => Err(ApiError::Cancelled),
        (Err(e), _) | (Ok(_), Err(e)) => Err(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
