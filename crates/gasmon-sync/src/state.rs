//! The engine's view of current truth.

use core::fmt;
use std::time::Duration;

use gasmon_types::Reading;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::backoff::BackoffPolicy;

/// Lifecycle of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncPhase {
    /// The bootstrap fetch has not resolved yet.
    #[default]
    Initializing,
    /// The last fetch cycle or push succeeded.
    Synced,
    /// One or more consecutive failures; cached data is being served.
    Degraded,
    /// The engine has shut down.
    Terminated,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Initializing => "initializing",
            SyncPhase::Synced => "synced",
            SyncPhase::Degraded => "degraded",
            SyncPhase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side judgment of whether data is fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
        })
    }
}

/// Snapshot of a sync session.
///
/// Only the [`SyncEngine`](crate::SyncEngine) mutates this; observers get
/// clones through a [`SyncHandle`](crate::SyncHandle).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    phase: SyncPhase,
    latest: Option<Reading>,
    /// Oldest first.
    history: Vec<Reading>,
    last_updated: Option<Instant>,
    last_updated_at: Option<OffsetDateTime>,
    latest_error: Option<String>,
    history_error: Option<String>,
    poll_interval: Duration,
    consecutive_failures: u32,
}

impl SyncState {
    pub(crate) fn new(base_interval: Duration) -> Self {
        Self {
            phase: SyncPhase::Initializing,
            latest: None,
            history: Vec::new(),
            last_updated: None,
            last_updated_at: None,
            latest_error: None,
            history_error: None,
            poll_interval: base_interval,
            consecutive_failures: 0,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// The cached latest reading.
    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Recent readings, oldest first.
    pub fn history(&self) -> &[Reading] {
        &self.history
    }

    /// Monotonic time of the last successful update.
    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    /// Wall-clock time of the last successful update, for display.
    pub fn last_updated_at(&self) -> Option<OffsetDateTime> {
        self.last_updated_at
    }

    /// Error from the most recent latest-reading fetch, if it failed.
    pub fn latest_error(&self) -> Option<&str> {
        self.latest_error.as_deref()
    }

    /// Error from the most recent history fetch, if it failed.
    pub fn history_error(&self) -> Option<&str> {
        self.history_error.as_deref()
    }

    /// Whichever fetch error is present, latest first.
    pub fn last_error(&self) -> Option<&str> {
        self.latest_error().or_else(|| self.history_error())
    }

    /// Delay before the next scheduled poll.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the cached latest reading has any channel in danger.
    pub fn has_alert(&self) -> bool {
        self.latest.as_ref().is_some_and(|r| r.alert_flag)
    }

    /// `true` iff a successful update happened less than `window` before `now`.
    pub fn is_live(&self, now: Instant, window: Duration) -> bool {
        self.last_updated
            .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    pub fn connection_status(&self, now: Instant, window: Duration) -> ConnectionStatus {
        if self.is_live(now, window) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    // ======================================================================
    // Engine-side mutations
    // ======================================================================

    /// Take a pushed reading as the latest state.
    ///
    /// A push always proves the server reachable and resets the backoff, but
    /// a reading older than the cached one does not replace it.
    pub(crate) fn apply_push(
        &mut self,
        reading: Reading,
        now: Instant,
        wall: OffsetDateTime,
        base_interval: Duration,
    ) {
        let stale = self
            .latest
            .as_ref()
            .is_some_and(|cached| reading.created_at < cached.created_at);
        if !stale {
            self.latest = Some(reading);
            self.latest_error = None;
        }
        self.record_success(now, wall, base_interval);
    }

    /// Apply a polled latest reading unless it is older than the cached one.
    ///
    /// Returns whether the cache changed.
    pub(crate) fn apply_latest(&mut self, reading: Option<Reading>) -> bool {
        self.latest_error = None;
        let Some(reading) = reading else {
            return false;
        };
        if let Some(cached) = &self.latest
            && reading.created_at < cached.created_at
        {
            return false;
        }
        let changed = self.latest.as_ref() != Some(&reading);
        self.latest = Some(reading);
        changed
    }

    /// Replace the history buffer from a newest-first page.
    pub(crate) fn apply_history(&mut self, mut newest_first: Vec<Reading>, limit: u32) {
        newest_first.truncate(limit as usize);
        newest_first.reverse();
        self.history = newest_first;
        self.history_error = None;
    }

    pub(crate) fn set_latest_error(&mut self, error: String) {
        self.latest_error = Some(error);
    }

    pub(crate) fn set_history_error(&mut self, error: String) {
        self.history_error = Some(error);
    }

    pub(crate) fn record_success(
        &mut self,
        now: Instant,
        wall: OffsetDateTime,
        base_interval: Duration,
    ) {
        self.phase = SyncPhase::Synced;
        self.consecutive_failures = 0;
        self.poll_interval = base_interval;
        self.last_updated = Some(now);
        self.last_updated_at = Some(wall);
    }

    pub(crate) fn record_failure(&mut self, policy: &BackoffPolicy) {
        self.phase = SyncPhase::Degraded;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.poll_interval = policy.interval_for(self.consecutive_failures);
    }

    pub(crate) fn terminate(&mut self) {
        self.phase = SyncPhase::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::reading;
    use time::macros::datetime;

    const BASE: Duration = Duration::from_secs(5);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn fresh() -> SyncState {
        SyncState::new(BASE)
    }

    #[test]
    fn test_initial_state() {
        let state = fresh();
        assert_eq!(state.phase(), SyncPhase::Initializing);
        assert!(state.latest().is_none());
        assert!(state.history().is_empty());
        assert_eq!(state.poll_interval(), BASE);
        assert_eq!(
            state.connection_status(Instant::now(), secs(30)),
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_backoff_after_failures() {
        let policy = BackoffPolicy::default();
        let mut state = fresh();

        state.record_failure(&policy);
        assert_eq!(state.poll_interval(), secs(5));
        assert_eq!(state.phase(), SyncPhase::Degraded);

        state.record_failure(&policy);
        assert_eq!(state.poll_interval(), secs(10));

        for _ in 0..3 {
            state.record_failure(&policy);
        }
        assert_eq!(state.consecutive_failures(), 5);
        assert_eq!(state.poll_interval(), secs(30));
    }

    #[test]
    fn test_push_resets_backoff() {
        let policy = BackoffPolicy::default();
        let mut state = fresh();
        for _ in 0..4 {
            state.record_failure(&policy);
        }
        state.set_latest_error("API error (500): Internal server error".into());
        assert_eq!(state.poll_interval(), secs(30));

        let pushed = reading("p", 410.0, datetime!(2025-01-01 12:00 UTC));
        state.apply_push(pushed.clone(), Instant::now(), datetime!(2025-01-01 12:00 UTC), BASE);

        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.poll_interval(), BASE);
        assert_eq!(state.phase(), SyncPhase::Synced);
        assert_eq!(state.latest(), Some(&pushed));
        assert!(state.latest_error().is_none());
        assert!(state.has_alert());
    }

    #[test]
    fn test_duplicate_push_is_idempotent() {
        let now = Instant::now();
        let wall = datetime!(2025-01-01 12:00 UTC);
        let pushed = reading("dup", 12.0, wall);

        let mut state = fresh();
        state.apply_push(pushed.clone(), now, wall, BASE);
        let once = state.clone();
        state.apply_push(pushed.clone(), now, wall, BASE);

        assert_eq!(state, once);
        assert_eq!(state.latest(), Some(&pushed));
    }

    #[test]
    fn test_older_push_keeps_newer_latest() {
        let policy = BackoffPolicy::default();
        let now = Instant::now();
        let newer = reading("r2", 450.0, datetime!(2025-01-01 12:00:05 UTC));
        let older = reading("r1", 10.0, datetime!(2025-01-01 12:00:00 UTC));

        let mut state = fresh();
        state.apply_push(newer.clone(), now, datetime!(2025-01-01 12:00:05 UTC), BASE);
        state.record_failure(&policy);
        state.record_failure(&policy);
        state.apply_push(older, now, datetime!(2025-01-01 12:00:06 UTC), BASE);

        assert_eq!(state.latest(), Some(&newer));
        assert!(state.has_alert());
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.poll_interval(), BASE);
    }

    #[test]
    fn test_staleness_boundary() {
        let mut state = fresh();
        let updated = Instant::now();
        state.record_success(updated, datetime!(2025-01-01 12:00 UTC), BASE);

        let window = secs(30);
        assert_eq!(
            state.connection_status(updated + secs(29), window),
            ConnectionStatus::Connected
        );
        assert_eq!(
            state.connection_status(updated + secs(31), window),
            ConnectionStatus::Disconnected
        );
        // Exactly at the window is already stale
        assert!(!state.is_live(updated + window, window));
    }

    #[test]
    fn test_polled_latest_never_goes_backwards() {
        let mut state = fresh();
        let newer = reading("new", 1.0, datetime!(2025-01-01 12:00:10 UTC));
        let older = reading("old", 1.0, datetime!(2025-01-01 12:00:00 UTC));

        assert!(state.apply_latest(Some(newer.clone())));
        assert!(!state.apply_latest(Some(older)));
        assert_eq!(state.latest(), Some(&newer));

        // An empty store does not erase what a push delivered
        assert!(!state.apply_latest(None));
        assert_eq!(state.latest(), Some(&newer));
    }

    #[test]
    fn test_history_is_stored_oldest_first_and_bounded() {
        let mut state = fresh();
        let page = vec![
            reading("c", 3.0, datetime!(2025-01-01 12:00:02 UTC)),
            reading("b", 2.0, datetime!(2025-01-01 12:00:01 UTC)),
            reading("a", 1.0, datetime!(2025-01-01 12:00:00 UTC)),
        ];

        state.set_history_error("history timed out after 10s".into());
        state.apply_history(page.clone(), 50);
        let ids: Vec<&str> = state.history().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(state.history_error().is_none());

        state.apply_history(page, 2);
        let ids: Vec<&str> = state.history().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_last_error_prefers_latest() {
        let mut state = fresh();
        state.set_history_error("history failed".into());
        assert_eq!(state.last_error(), Some("history failed"));
        state.set_latest_error("latest failed".into());
        assert_eq!(state.last_error(), Some("latest failed"));
    }
}
