//! Error types for Resound.
//!
//! Only construction-time and I/O failures are errors. A play request that is
//! declined at runtime (missing profile, concurrency ceiling, exhausted pool)
//! is reported as `None`/`false` by the caller-facing API instead.

use thiserror::Error;

/// Result type alias using Resound's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Resound.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Audio errors
    #[error("Audio decode error: {0}")]
    AudioDecode(String),

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error was raised while validating configuration.
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::Config(_) | Self::Json(_))
    }

    /// Shorthand for an [`Error::InvalidConfig`].
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
