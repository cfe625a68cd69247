//! Error types for inkday.

use thiserror::Error;

/// Errors that can occur in inkday operations.
#[derive(Error, Debug)]
pub enum InkdayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Recurrence error: {0}")]
    Recurrence(String),

    #[error("Time conversion error: {0}")]
    Time(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Fetching {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Weather error: {0}")]
    Weather(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Display driver '{0}' not found in PATH")]
    DriverNotInstalled(String),

    #[error("Driver request timed out after {0}s")]
    DriverTimeout(u64),

    #[error("Render error: {0}")]
    Render(String),

    #[error("No wake time left after planning")]
    EmptyWakeSet,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for inkday operations.
pub type InkdayResult<T> = Result<T, InkdayError>;
