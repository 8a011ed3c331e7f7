//! Alerting Error Types

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the alerting service
#[derive(Debug, Error)]
pub enum AlertError {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Measurement handed to a helper is not usable
    #[error("Invalid measurement for {field}: {reason}")]
    InvalidMeasurement {
        field: &'static str,
        reason: String,
    },
}

impl AlertError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidMeasurement {
            field,
            reason: reason.into(),
        }
    }
}

/// Outcome of a failed delivery attempt on one channel
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Channel is switched off
    #[error("Channel disabled")]
    Disabled,

    /// Channel is enabled but lacks required settings
    #[error("Channel misconfigured: {0}")]
    Misconfigured(String),

    /// Local I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP request could not be sent
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote endpoint answered with a non-success status
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// External transport rejected the message
    #[error("Transport error: {0}")]
    Transport(String),

    /// Attempt exceeded the per-channel deadline
    #[error("Timed out after {0:?}")]
    TimedOut(Duration),

    /// Adapter task panicked or was aborted
    #[error("Adapter task failed: {0}")]
    Panicked(String),
}

impl From<std::io::Error> for DeliveryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}
