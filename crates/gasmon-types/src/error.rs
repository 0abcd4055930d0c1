//! Error types for payload decoding in gasmon-types.

use thiserror::Error;

/// Errors that can occur when decoding a sensor payload.
///
/// Missing or non-numeric fields are not errors (they coerce to `0`); only a
/// body that cannot be read as a JSON object is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    /// The body is not valid JSON.
    #[error("Invalid JSON body: {0}")]
    InvalidJson(String),

    /// The body is valid JSON but not an object.
    #[error("Request body must be a JSON object")]
    NotAnObject,

    /// A status string other than `SAFE` or `DANGER`.
    #[error("Unknown gas status: {0}")]
    UnknownStatus(String),
}

/// Result type alias using gasmon-types' PayloadError type.
pub type PayloadResult<T> = std::result::Result<T, PayloadError>;
