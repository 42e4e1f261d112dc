//! Error types for tagsieve.
//!
//! Only malformed *shape* is an error. Filters that match nothing and boolean
//! queries that mix `AND` with `OR` are ordinary return values.

use thiserror::Error;

/// Result type alias using tagsieve's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tagsieve operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input has the wrong shape (non-string query, non-list tag source, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A regex include/exclude pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Preference store read/write failed
    #[error("Store error: {0}")]
    Store(String),

    /// Named preset does not exist in the store
    #[error("Preset not found: {0}")]
    PresetNotFound(String),
}

impl Error {
    /// Build an `InvalidPattern` from a regex compile failure.
    pub fn invalid_pattern(pattern: &str, err: regex::Error) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
