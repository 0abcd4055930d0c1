//! Application state shared across handlers.
//!
//! # Push Channel Behavior
//!
//! The `readings_tx` broadcast channel carries one [`ReadingEvent`] per
//! successful insert to every WebSocket subscriber.
//!
//! - **Buffer size**: Configurable via `server.broadcast_buffer` (default: 100)
//! - **Message loss**: A subscriber that falls behind skips the oldest events;
//!   clients recover through their regular history poll
//! - **No blocking**: Ingestion never waits on subscribers

use std::sync::Arc;

use gasmon_store::Store;
use gasmon_types::{Classifier, Reading, ReadingEvent};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for thread-safe access).
    pub store: Mutex<Store>,
    /// Configuration, fixed for the lifetime of the process.
    pub config: Config,
    /// Classifier built from `config.classifier`.
    pub classifier: Classifier,
    /// Broadcast channel for inserted readings.
    pub readings_tx: broadcast::Sender<ReadingEvent>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        let (readings_tx, _) = broadcast::channel(config.server.broadcast_buffer.max(1));
        let classifier = Classifier::new(config.classifier.gas_threshold);
        Arc::new(Self {
            store: Mutex::new(store),
            config,
            classifier,
            readings_tx,
        })
    }

    /// Notify push subscribers of a freshly inserted reading.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, reading: &Reading) {
        let event = ReadingEvent::Inserted {
            reading: reading.clone(),
        };
        match self.readings_tx.send(event) {
            Ok(receivers) => debug!(id = %reading.id, receivers, "Published reading"),
            Err(_) => debug!(id = %reading.id, "No push subscribers"),
        }
    }
}
