//! Error types for Edu Reco.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Wizard construction errors. Navigation itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Wizard needs at least one step")]
    NoSteps,

    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),
}

/// Failures of a server-push stream. All of them are terminal for the
/// message they belong to; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Failed to build stream URL: {0}")]
    InvalidUrl(String),

    #[error("Stream request failed: {0}")]
    Transport(String),

    #[error("Stream endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("Malformed stream event: {0}")]
    Malformed(String),

    #[error("Stream closed before [DONE]")]
    Disconnected,

    #[error("Stream produced no terminal event within {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
