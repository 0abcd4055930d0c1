//! Error types for gasmon-store.

use std::path::PathBuf;

/// Result type for gasmon-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gasmon-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The database was written by a newer schema than this build understands.
    #[error("Unsupported schema version {found} (expected at most {supported})")]
    UnsupportedSchema { found: i32, supported: i32 },
}
