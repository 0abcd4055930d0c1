//! Client-side sync engine for gasmon.
//!
//! A [`SyncEngine`] keeps a local view of the latest reading and recent
//! history fresh under an unreliable network. It reconciles three update
//! sources:
//!
//! 1. **Bootstrap fetch** when the engine starts
//! 2. **Adaptive poll loop** that backs off exponentially on failure
//! 3. **Push channel** delivering each inserted reading as it happens
//!
//! Failures never propagate to the caller. They are recorded in the
//! [`SyncState`] observed through a [`SyncHandle`], and the engine keeps
//! retrying at the capped backoff interval.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gasmon_sync::{ServiceClient, SyncConfig, SyncEngine, WsPushChannel};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:8080")?;
//! let push = WsPushChannel::for_client(&client);
//!
//! let handle = SyncEngine::new(SyncConfig::default(), Arc::new(client), Arc::new(push))?.start();
//!
//! let mut updates = handle.subscribe();
//! while updates.changed().await.is_ok() {
//!     let state = updates.borrow().clone();
//!     println!("{} (alert: {})", state.phase(), state.has_alert());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod mock;
pub mod push;
pub mod source;
pub mod state;

pub use backoff::BackoffPolicy;
pub use client::{HealthResponse, IngestResponse, ServiceClient};
pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncHandle};
pub use error::{Result, SyncError};
pub use mock::{MockPushChannel, MockSource};
pub use push::WsPushChannel;
pub use source::{PushChannel, PushSender, ReadingSource, Subscription};
pub use state::{ConnectionStatus, SyncPhase, SyncState};
