//! Error types for the Opsgenie alerts manager

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the alerts manager
#[derive(Error, Debug)]
pub enum Error {
    /// Opsgenie connection error (DNS, TLS, transport)
    #[error("Opsgenie connection error: {0}")]
    OpsgenieConnection(#[source] reqwest::Error),

    /// Opsgenie API rejected the request
    #[error("Opsgenie API error: {status}: {message}")]
    OpsgenieApi { status: u16, message: String },

    /// Schedule time parse error
    #[error("Invalid schedule time {0:?}: expected HH:MM (24-hour)")]
    ScheduleParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics registration or encoding error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
