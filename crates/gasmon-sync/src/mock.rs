//! In-memory reading source and push channel for testing.
//!
//! # Features
//!
//! - **Failure injection**: Fail latest fetches, history fetches, or both
//! - **Latency simulation**: Delay each fetch kind independently
//! - **Push injection**: Deliver insertion events to live subscriptions
//! - **Call tracking**: Count fetches and record when latest fetches started

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gasmon_types::{Classifier, Reading, ReadingEvent, SensorPayload};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{Result, SyncError};
use crate::source::{PushChannel, PushSender, ReadingSource, Subscription};

/// Build a classified reading with the given gas1 value.
///
/// The remaining channels are zero.
pub fn reading(id: &str, gas1: f64, created_at: OffsetDateTime) -> Reading {
    Classifier::default()
        .evaluate(&SensorPayload {
            gas1,
            temperature: 22.0,
            humidity: 45.0,
            distance: 80.0,
            ..SensorPayload::default()
        })
        .into_reading(id.to_string(), created_at)
}

/// A [`ReadingSource`] backed by in-memory readings.
///
/// # Example
///
/// ```
/// use gasmon_sync::{MockSource, ReadingSource};
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockSource::new();
///     source.set_should_fail(true);
///     assert!(source.fetch_latest().await.is_err());
/// }
/// ```
#[derive(Default)]
pub struct MockSource {
    latest: RwLock<Option<Reading>>,
    /// Newest first.
    history: RwLock<Vec<Reading>>,
    fail_latest: AtomicBool,
    fail_history: AtomicBool,
    latest_latency_ms: AtomicU64,
    history_latency_ms: AtomicU64,
    latest_calls: AtomicU32,
    history_calls: AtomicU32,
    latest_started: Mutex<Vec<Instant>>,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("fail_latest", &self.fail_latest.load(Ordering::Relaxed))
            .field("fail_history", &self.fail_history.load(Ordering::Relaxed))
            .field("latest_calls", &self.latest_calls.load(Ordering::Relaxed))
            .field("history_calls", &self.history_calls.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockSource {
    /// An empty source that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source pre-populated with readings (any order).
    pub fn with_readings(readings: impl IntoIterator<Item = Reading>) -> Self {
        let mut history: Vec<Reading> = readings.into_iter().collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            latest: RwLock::new(history.first().cloned()),
            history: RwLock::new(history),
            ..Self::default()
        }
    }

    /// Store a new reading as the latest.
    pub async fn add_reading(&self, reading: Reading) {
        *self.latest.write().await = Some(reading.clone());
        self.history.write().await.insert(0, reading);
    }

    /// Replace the whole history page (newest first) without touching latest.
    pub async fn set_history(&self, newest_first: Vec<Reading>) {
        *self.history.write().await = newest_first;
    }

    /// Fail every fetch.
    pub fn set_should_fail(&self, fail: bool) {
        self.set_fail_latest(fail);
        self.set_fail_history(fail);
    }

    pub fn set_fail_latest(&self, fail: bool) {
        self.fail_latest.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::Relaxed);
    }

    /// Delay applied to every fetch kind.
    pub fn set_latency(&self, latency: Duration) {
        self.set_latest_latency(latency);
        self.set_history_latency(latency);
    }

    pub fn set_latest_latency(&self, latency: Duration) {
        self.latest_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Delay for history fetches. Read when a fetch starts.
    pub fn set_history_latency(&self, latency: Duration) {
        self.history_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn latest_calls(&self) -> u32 {
        self.latest_calls.load(Ordering::Relaxed)
    }

    pub fn history_calls(&self) -> u32 {
        self.history_calls.load(Ordering::Relaxed)
    }

    /// When each latest fetch started, in call order.
    pub fn latest_call_times(&self) -> Vec<Instant> {
        self.latest_started
            .lock()
            .map(|times| times.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn injected_failure(operation: &str) -> SyncError {
        SyncError::Api {
            status: 503,
            message: format!("Mock {operation} failure"),
        }
    }
}

async fn simulate_latency(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl ReadingSource for MockSource {
    async fn fetch_latest(&self) -> Result<Option<Reading>> {
        self.latest_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut times) = self.latest_started.lock() {
            times.push(Instant::now());
        }

        let snapshot = self.latest.read().await.clone();
        simulate_latency(self.latest_latency_ms.load(Ordering::Relaxed)).await;

        if self.fail_latest.load(Ordering::Relaxed) {
            return Err(Self::injected_failure("latest"));
        }
        Ok(snapshot)
    }

    async fn fetch_history(&self, limit: u32) -> Result<Vec<Reading>> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);

        let snapshot: Vec<Reading> = self
            .history
            .read()
            .await
            .iter()
            .take(limit as usize)
            .cloned()
            .collect();
        simulate_latency(self.history_latency_ms.load(Ordering::Relaxed)).await;

        if self.fail_history.load(Ordering::Relaxed) {
            return Err(Self::injected_failure("history"));
        }
        Ok(snapshot)
    }
}

/// A [`PushChannel`] whose events are injected by the test.
#[derive(Debug, Default)]
pub struct MockPushChannel {
    senders: Mutex<Vec<PushSender>>,
}

impl MockPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an insertion event to every live subscription.
    ///
    /// Returns how many subscriptions received it.
    pub async fn push(&self, reading: Reading) -> usize {
        let senders = self.live_senders();
        let mut delivered = 0;
        for sender in senders {
            let event = ReadingEvent::Inserted {
                reading: reading.clone(),
            };
            if sender.send(event).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of subscriptions that have not been cancelled.
    pub fn active_subscriptions(&self) -> usize {
        self.live_senders().len()
    }

    /// Total number of subscribe calls.
    pub fn total_subscriptions(&self) -> usize {
        self.senders.lock().map(|s| s.len()).unwrap_or_default()
    }

    fn live_senders(&self) -> Vec<PushSender> {
        self.senders
            .lock()
            .map(|senders| {
                senders
                    .iter()
                    .filter(|s| !s.is_cancelled())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl PushChannel for MockPushChannel {
    fn subscribe(&self) -> Subscription {
        let (sender, subscription) = Subscription::channel(16);
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(sender);
        }
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_mock_source_serves_newest_first() {
        let source = MockSource::with_readings([
            reading("a", 1.0, datetime!(2025-01-01 12:00:00 UTC)),
            reading("c", 3.0, datetime!(2025-01-01 12:00:02 UTC)),
            reading("b", 2.0, datetime!(2025-01-01 12:00:01 UTC)),
        ]);

        let latest = source.fetch_latest().await.unwrap().unwrap();
        assert_eq!(latest.id, "c");

        let history = source.fetch_history(2).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "b"]);
        assert_eq!(source.latest_calls(), 1);
        assert_eq!(source.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_failure_injection() {
        let source = MockSource::new();
        source.set_fail_history(true);

        assert!(source.fetch_latest().await.unwrap().is_none());
        let err = source.fetch_history(10).await.unwrap_err();
        assert!(matches!(err, SyncError::Api { status: 503, .. }));

        source.set_should_fail(false);
        assert!(source.fetch_history(10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_source_latency() {
        let source = MockSource::new();
        source.set_latency(Duration::from_millis(200));

        let start = Instant::now();
        source.fetch_latest().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_mock_push_channel_delivers_to_live_subscriptions() {
        let channel = MockPushChannel::new();
        let mut first = channel.subscribe();
        let second = channel.subscribe();
        drop(second);

        let pushed = reading("p", 500.0, datetime!(2025-01-01 12:00 UTC));
        assert_eq!(channel.push(pushed.clone()).await, 1);
        assert_eq!(channel.active_subscriptions(), 1);
        assert_eq!(channel.total_subscriptions(), 2);

        let event = first.recv().await.unwrap();
        assert_eq!(event.reading(), &pushed);
    }

    #[test]
    fn test_reading_helper_classifies() {
        let r = reading("x", 401.0, datetime!(2025-01-01 12:00 UTC));
        assert!(r.alert_flag);
        assert!(r.gas1_status.is_danger());
        assert!(!r.gas2_status.is_danger());
    }
}
