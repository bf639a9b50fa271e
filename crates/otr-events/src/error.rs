//! Error types for the otr-events crate.

use thiserror::Error;

/// Analytics error type covering all possible failure modes.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    // Serialization errors
    /// Failed to serialize data.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize data.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    // Value errors
    /// A name or discriminant does not map to a known enumeration value.
    #[error("invalid {kind}: {value}")]
    InvalidValue {
        /// The enumeration being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    // Sink errors
    /// The sink can no longer accept events.
    #[error("sink closed: {0}")]
    SinkClosed(String),

    /// The sink failed to store or forward an event.
    #[error("sink write failed: {0}")]
    SinkWrite(String),

    /// A lock guarding sink state was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

// Conversions from underlying crate errors

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_eof() || err.is_syntax() {
            AnalyticsError::Deserialization(err.to_string())
        } else {
            AnalyticsError::Serialization(err.to_string())
        }
    }
}

impl From<rmp_serde::encode::Error> for AnalyticsError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        AnalyticsError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for AnalyticsError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        AnalyticsError::Deserialization(err.to_string())
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
                AnalyticsError::SinkClosed(err.to_string())
            }
            _ => AnalyticsError::SinkWrite(err.to_string()),
        }
    }
}
