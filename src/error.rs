// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Failure kinds of the relay core. A suppressed duplicate is not one of
/// them: it is an ordinary `DispatchResult`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed timestamp: {0:?} (expected HH:MM:SS)")]
    MalformedTimestamp(String),

    #[error("journal write failed: {0}")]
    JournalWrite(String),

    #[error("sink {sink} failed: {message}")]
    Sink { sink: String, message: String },

    #[error("posting quota exhausted ({max} posts per {window_secs}s)")]
    QuotaExhausted { max: usize, window_secs: u64 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<csv::Error> for RelayError {
    fn from(err: csv::Error) -> Self {
        RelayError::JournalWrite(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::JournalWrite(err.to_string())
    }
}
