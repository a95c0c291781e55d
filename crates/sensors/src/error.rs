//! Error types for sensors

use arrival_config::ConfigError;
use arrival_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while building or polling a sensor
#[derive(Error, Debug)]
pub enum SensorError {
    /// Invalid sensor configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid timestamp, precision or URI
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Cron constraint could not be parsed or never matches
    #[error("invalid cron constraint '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    /// Remote storage call failed
    #[error("object store error at '{location}': {source}")]
    Store {
        location: String,
        #[source]
        source: object_store::Error,
    },

    /// State object missing, empty or lacking the timestamp field
    #[error("unable to load state from '{uri}': {reason}")]
    State { uri: String, reason: String },
}

impl SensorError {
    /// Create a Store error for a location
    pub fn store(location: impl Into<String>, source: object_store::Error) -> Self {
        Self::Store {
            location: location.into(),
            source,
        }
    }

    /// Create a State error
    pub fn state(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::State {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}
