//! Append-only persistence for classified gas sensor readings.
//!
//! This crate implements the store contract the ingestion service relies on:
//!
//! - Each insert appends exactly one row; rows are never updated or deleted
//! - The store assigns the identifier (UUID v4) and creation timestamp
//! - Creation timestamps never decrease in insertion order
//! - Reads are ordered by `created_at`, ties broken by insertion order
//!
//! # Example
//!
//! ```
//! use gasmon_store::{ReadingQuery, Store};
//! use gasmon_types::{Classifier, SensorPayload};
//!
//! let store = Store::open_in_memory()?;
//! let payload = SensorPayload { gas1: 520.0, ..SensorPayload::default() };
//! let reading = store.insert_reading(&Classifier::default().evaluate(&payload))?;
//! assert!(reading.alert_flag);
//!
//! let recent = store.query_readings(&ReadingQuery::new().limit(10))?;
//! assert_eq!(recent[0].id, reading.id);
//! # Ok::<(), gasmon_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::ReadingQuery;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/gasmon/readings.db`
/// - macOS: `~/Library/Application Support/gasmon/readings.db`
/// - Windows: `C:\Users\<user>\AppData\Local\gasmon\readings.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("gasmon")
        .join("readings.db")
}
