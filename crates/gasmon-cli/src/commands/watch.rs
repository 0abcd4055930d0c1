//! Watch command implementation.
//!
//! Runs a sync engine against the service and prints what changes: new
//! readings (with an alert banner when any channel is in danger), sync phase
//! transitions, fetch errors and the connection status.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gasmon_sync::{ConnectionStatus, ServiceClient, SyncConfig, SyncEngine, SyncPhase, WsPushChannel};
use gasmon_types::Reading;
use tracing::info;

use crate::cli::{OutputFormat, WatchCommand};
use crate::format::{FormatOptions, alert_banner, format_reading_json, format_reading_line};

/// How often the connection status is re-evaluated.
const STATUS_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Something worth printing.
#[derive(Debug, Clone, PartialEq)]
enum WatchEvent {
    Phase(SyncPhase),
    Reading(Reading),
    Error(String),
}

/// Remembers what has been printed so only changes are reported.
#[derive(Debug, Default)]
struct WatchTracker {
    phase: Option<SyncPhase>,
    latest_id: Option<String>,
    error: Option<String>,
    status: Option<ConnectionStatus>,
}

impl WatchTracker {
    fn observe(
        &mut self,
        phase: SyncPhase,
        latest: Option<&Reading>,
        error: Option<&str>,
    ) -> Vec<WatchEvent> {
        let mut events = Vec::new();

        if self.phase != Some(phase) {
            self.phase = Some(phase);
            events.push(WatchEvent::Phase(phase));
        }

        if let Some(reading) = latest
            && self.latest_id.as_deref() != Some(reading.id.as_str())
        {
            self.latest_id = Some(reading.id.clone());
            events.push(WatchEvent::Reading(reading.clone()));
        }

        if self.error.as_deref() != error {
            self.error = error.map(String::from);
            if let Some(error) = error {
                events.push(WatchEvent::Error(error.to_string()));
            }
        }

        events
    }

    /// Returns the status if it differs from the last one seen.
    fn status_change(&mut self, status: ConnectionStatus) -> Option<ConnectionStatus> {
        if self.status == Some(status) {
            return None;
        }
        self.status = Some(status);
        Some(status)
    }
}

fn print_event(event: &WatchEvent, format: OutputFormat, opts: &FormatOptions) -> Result<()> {
    match event {
        WatchEvent::Phase(phase) => eprintln!("sync: {phase}"),
        WatchEvent::Error(error) => eprintln!("sync error: {error}"),
        WatchEvent::Reading(reading) => match format {
            OutputFormat::Text => {
                println!("{}", format_reading_line(reading, opts));
                if let Some(banner) = alert_banner(reading, opts) {
                    println!("{banner}");
                }
            }
            OutputFormat::Json => println!("{}", format_reading_json(reading)?),
        },
    }
    Ok(())
}

pub async fn cmd_watch(client: ServiceClient, args: WatchCommand, opts: FormatOptions) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    if let Some(interval) = args.interval {
        config.base_interval = interval;
        config.max_interval = config.max_interval.max(interval);
    }
    let opts = FormatOptions {
        depth_cm: args.depth,
        ..opts
    };

    info!("Watching {}", client.base_url());
    let push = WsPushChannel::for_client(&client);
    let handle = SyncEngine::new(config, Arc::new(client), Arc::new(push))?.start();

    let mut updates = handle.subscribe();
    let mut tracker = WatchTracker::default();
    let mut status_check = tokio::time::interval(STATUS_CHECK_INTERVAL);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                for event in tracker.observe(state.phase(), state.latest(), state.last_error()) {
                    print_event(&event, args.format, &opts)?;
                }
            }
            _ = status_check.tick() => {
                if let Some(status) = tracker.status_change(handle.connection_status()) {
                    eprintln!("connection: {status}");
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasmon_types::{Classifier, SensorPayload};
    use time::macros::datetime;

    fn reading(id: &str) -> Reading {
        Classifier::default()
            .evaluate(&SensorPayload::default())
            .into_reading(id.to_string(), datetime!(2025-01-01 00:00 UTC))
    }

    #[test]
    fn test_tracker_reports_only_changes() {
        let mut tracker = WatchTracker::default();
        let a = reading("a");

        let events = tracker.observe(SyncPhase::Synced, Some(&a), None);
        assert_eq!(
            events,
            vec![WatchEvent::Phase(SyncPhase::Synced), WatchEvent::Reading(a.clone())]
        );

        // Same state again prints nothing
        assert!(tracker.observe(SyncPhase::Synced, Some(&a), None).is_empty());

        let events = tracker.observe(SyncPhase::Degraded, Some(&a), Some("timed out"));
        assert_eq!(
            events,
            vec![
                WatchEvent::Phase(SyncPhase::Degraded),
                WatchEvent::Error("timed out".into())
            ]
        );

        let b = reading("b");
        let events = tracker.observe(SyncPhase::Synced, Some(&b), None);
        assert_eq!(
            events,
            vec![WatchEvent::Phase(SyncPhase::Synced), WatchEvent::Reading(b)]
        );
    }

    #[test]
    fn test_tracker_status_change() {
        let mut tracker = WatchTracker::default();
        assert_eq!(
            tracker.status_change(ConnectionStatus::Disconnected),
            Some(ConnectionStatus::Disconnected)
        );
        assert_eq!(tracker.status_change(ConnectionStatus::Disconnected), None);
        assert_eq!(
            tracker.status_change(ConnectionStatus::Connected),
            Some(ConnectionStatus::Connected)
        );
    }
}
