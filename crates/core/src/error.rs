//! Error types for the gap-fill pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gap-fill pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or unparseable values).
    #[error("Data error: {0}")]
    Data(String),

    /// The raw series had no usable observations.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A single raw observation is missing required fields.
    #[error("Malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Market-data retrieval error.
    #[error("Feed error: {0}")]
    Feed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an empty input error.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Error::EmptyInput(msg.into())
    }

    /// Create a malformed record error.
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            index,
            reason: reason.into(),
        }
    }

    /// Create a feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Error::Feed(msg.into())
    }
}
