//! The sync engine: one cooperative task reconciling bootstrap, poll and push.
//!
//! All state changes happen on the engine task. Fetches run as futures the
//! task polls, push events arrive on the [`Subscription`] queue and manual
//! refreshes arrive on a command queue, so [`SyncState`] needs no locking.
//! Observers read snapshots from a [`watch`] channel.
//!
//! At most one push-triggered history refresh is in flight; pushes arriving
//! meanwhile mark it dirty and one more refresh follows when it completes.
//!
//! History fetches carry an issue sequence number. A completed fetch is
//! applied only if it was issued after the last one applied, so a slow poll
//! can never overwrite the refresh triggered by a later push.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use gasmon_types::{Reading, ReadingEvent};
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::source::{PushChannel, ReadingSource};
use crate::state::{ConnectionStatus, SyncState};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Requests sent from a [`SyncHandle`] to the engine task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Refresh,
}

/// Result of one poll cycle (or the bootstrap fetch).
struct CycleOutcome {
    history_seq: u64,
    latest: Result<Option<Reading>>,
    history: Result<Vec<Reading>>,
}

/// Result of a push-triggered history refresh.
struct RefreshOutcome {
    history_seq: u64,
    history: Result<Vec<Reading>>,
}

/// Keeps a [`SyncState`] fresh from a [`ReadingSource`] and a [`PushChannel`].
pub struct SyncEngine {
    config: SyncConfig,
    source: Arc<dyn ReadingSource>,
    push: Arc<dyn PushChannel>,
}

impl SyncEngine {
    /// Create an engine. Fails only on an invalid configuration.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn ReadingSource>,
        push: Arc<dyn PushChannel>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            push,
        })
    }

    /// Spawn the engine task. The bootstrap fetch starts immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> SyncHandle {
        let policy = self.config.backoff();
        let initial = SyncState::new(policy.base());
        let (state_tx, state_rx) = watch::channel(initial.clone());
        let (command_tx, command_rx) = mpsc::channel(8);
        let cancel_token = CancellationToken::new();
        let stale_window = self.config.stale_window();

        let runner = Runner {
            config: self.config,
            policy,
            source: self.source,
            state: initial,
            state_tx,
            issued_seq: 0,
            applied_seq: 0,
        };
        let task = tokio::spawn(runner.run(self.push, command_rx, cancel_token.clone()));

        SyncHandle {
            state_rx,
            command_tx,
            cancel_token,
            stale_window,
            task: Some(task),
        }
    }
}

/// Control and observation handle for a running [`SyncEngine`].
///
/// Dropping the handle stops the engine.
#[derive(Debug)]
pub struct SyncHandle {
    state_rx: watch::Receiver<SyncState>,
    command_tx: mpsc::Sender<Command>,
    cancel_token: CancellationToken,
    stale_window: Duration,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Snapshot of the current state.
    pub fn state(&self) -> SyncState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    /// Connection status as of now.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.state_rx
            .borrow()
            .connection_status(Instant::now(), self.stale_window)
    }

    /// Ask for an immediate poll cycle.
    ///
    /// Ignored if a cycle is already in flight. Returns `false` once the
    /// engine has stopped.
    pub async fn refresh(&self) -> bool {
        self.command_tx.send(Command::Refresh).await.is_ok()
    }

    /// Whether the engine task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the engine and wait for its task to finish.
    ///
    /// Cancels the poll timer and the push subscription. The final state
    /// has phase [`Terminated`](crate::SyncPhase::Terminated).
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("Sync engine task ended abnormally: {}", e);
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct Runner {
    config: SyncConfig,
    policy: BackoffPolicy,
    source: Arc<dyn ReadingSource>,
    state: SyncState,
    state_tx: watch::Sender<SyncState>,
    issued_seq: u64,
    applied_seq: u64,
}

impl Runner {
    async fn run(
        mut self,
        push: Arc<dyn PushChannel>,
        mut commands: mpsc::Receiver<Command>,
        cancel_token: CancellationToken,
    ) {
        info!("Sync engine started");

        let mut subscription = push.subscribe();
        let mut push_open = true;
        let mut commands_open = true;
        let mut cycle = Some(self.poll_cycle());
        let mut refresh: Option<BoxFuture<RefreshOutcome>> = None;
        let mut refresh_dirty = false;
        let mut next_poll = Instant::now();

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,

                outcome = next_outcome(&mut cycle) => {
                    cycle = None;
                    self.apply_cycle(outcome);
                    next_poll = Instant::now() + self.state.poll_interval();
                    debug!("Next poll in {:?}", self.state.poll_interval());
                }

                _ = tokio::time::sleep_until(next_poll), if cycle.is_none() => {
                    cycle = Some(self.poll_cycle());
                }

                event = subscription.recv(), if push_open => match event {
                    Some(ReadingEvent::Inserted { reading }) => {
                        self.apply_push(reading);
                        if refresh.is_none() {
                            refresh = Some(self.history_refresh());
                        } else {
                            refresh_dirty = true;
                        }
                        if cycle.is_none() {
                            next_poll = next_poll.min(Instant::now() + self.policy.base());
                        }
                    }
                    Some(other) => debug!(?other, "Ignoring unsupported push event"),
                    None => {
                        warn!("Push channel closed; continuing with polling only");
                        push_open = false;
                    }
                },

                outcome = next_outcome(&mut refresh) => {
                    refresh = None;
                    self.apply_refresh(outcome);
                    if refresh_dirty {
                        refresh_dirty = false;
                        refresh = Some(self.history_refresh());
                    }
                }

                command = commands.recv(), if commands_open => match command {
                    Some(Command::Refresh) if cycle.is_none() => {
                        debug!("Manual refresh");
                        cycle = Some(self.poll_cycle());
                    }
                    Some(Command::Refresh) => debug!("Refresh ignored, cycle in flight"),
                    None => commands_open = false,
                },
            }
        }

        subscription.cancel();
        self.state.terminate();
        self.publish();
        info!("Sync engine stopped");
    }

    fn next_history_seq(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Fetch latest and history concurrently; resolves once both settle.
    fn poll_cycle(&mut self) -> BoxFuture<CycleOutcome> {
        let history_seq = self.next_history_seq();
        let source = Arc::clone(&self.source);
        let timeout = self.config.timeout();
        let limit = self.config.history_limit;

        Box::pin(async move {
            let (latest, history) = tokio::join!(
                with_timeout("latest fetch", timeout, source.fetch_latest()),
                with_timeout("history fetch", timeout, source.fetch_history(limit)),
            );
            CycleOutcome {
                history_seq,
                latest,
                history,
            }
        })
    }

    fn history_refresh(&mut self) -> BoxFuture<RefreshOutcome> {
        let history_seq = self.next_history_seq();
        let source = Arc::clone(&self.source);
        let timeout = self.config.timeout();
        let limit = self.config.history_limit;

        Box::pin(async move {
            let history = with_timeout("history fetch", timeout, source.fetch_history(limit)).await;
            RefreshOutcome {
                history_seq,
                history,
            }
        })
    }

    fn apply_cycle(&mut self, outcome: CycleOutcome) {
        let latest_ok = match outcome.latest {
            Ok(reading) => {
                self.state.apply_latest(reading);
                true
            }
            Err(e) => {
                warn!("Latest fetch failed: {}", e);
                self.state.set_latest_error(e.to_string());
                false
            }
        };
        let history_ok = self.apply_history_result(outcome.history_seq, outcome.history);

        if latest_ok || history_ok {
            self.state
                .record_success(Instant::now(), OffsetDateTime::now_utc(), self.policy.base());
        } else {
            self.state.record_failure(&self.policy);
            warn!(
                failures = self.state.consecutive_failures(),
                "Poll cycle failed, backing off to {:?}",
                self.state.poll_interval()
            );
        }
        self.publish();
    }

    fn apply_refresh(&mut self, outcome: RefreshOutcome) {
        if self.apply_history_result(outcome.history_seq, outcome.history) {
            self.state
                .record_success(Instant::now(), OffsetDateTime::now_utc(), self.policy.base());
        } else {
            self.state.record_failure(&self.policy);
        }
        self.publish();
    }

    /// Returns whether the fetch itself succeeded, applied or not.
    fn apply_history_result(&mut self, seq: u64, history: Result<Vec<Reading>>) -> bool {
        match history {
            Ok(readings) if seq > self.applied_seq => {
                self.applied_seq = seq;
                self.state.apply_history(readings, self.config.history_limit);
                true
            }
            Ok(_) => {
                debug!(seq, applied = self.applied_seq, "Discarding superseded history");
                true
            }
            Err(e) => {
                warn!("History fetch failed: {}", e);
                self.state.set_history_error(e.to_string());
                false
            }
        }
    }

    fn apply_push(&mut self, reading: Reading) {
        debug!(id = %reading.id, alert = reading.alert_flag, "Push received");
        self.state.apply_push(
            reading,
            Instant::now(),
            OffsetDateTime::now_utc(),
            self.policy.base(),
        );
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

/// Await the future in `slot`, or never resolve if it is empty.
async fn next_outcome<T>(slot: &mut Option<BoxFuture<T>>) -> T {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    duration: Duration,
    fetch: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(duration, fetch)
        .await
        .unwrap_or(Err(SyncError::Timeout {
            operation,
            duration,
        }))
}
