//! Protocol error types
//!
//! Errors raised while parsing timestamps, precisions, and URIs.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Timestamp text does not match the expected format
    #[error("cannot parse '{value}' with format '{format}': {reason}")]
    TimestampParse {
        value: String,
        format: String,
        reason: String,
    },

    /// Unknown instance timestamp precision
    #[error("invalid instance_ts_precision '{0}': expected one of S, M, H, D")]
    InvalidPrecision(String),

    /// URI could not be parsed
    #[error("malformed URI '{uri}': {reason}")]
    MalformedUri { uri: String, reason: String },

    /// URI scheme has no registered destination or store
    #[error("unknown protocol scheme '{scheme}' in '{uri}'")]
    UnknownScheme { scheme: String, uri: String },
}

impl ProtocolError {
    /// Create a timestamp parse error
    pub fn timestamp_parse(
        value: impl Into<String>,
        format: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::TimestampParse {
            value: value.into(),
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed URI error
    pub fn malformed_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown scheme error
    pub fn unknown_scheme(scheme: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::UnknownScheme {
            scheme: scheme.into(),
            uri: uri.into(),
        }
    }
}
