//! Error types for haa4b

use thiserror::Error;

/// haa4b error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input record (line/entry context in the message)
    #[error("Format error: {0}")]
    Format(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// B-tag calibration table error
    #[error("Calibration error: {0}")]
    Calibration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
