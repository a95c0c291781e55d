//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse the credentials file
    #[error("failed to parse credentials: {0}")]
    CredentialsParse(#[from] serde_json::Error),

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "sensor", "source")
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// A named secret is not present in the credentials mapping
    #[error("missing required credential '{key}'")]
    MissingCredential {
        /// Credential key
        key: String,
    },

    /// A named secret is present but has the wrong shape
    #[error("credential '{key}' is malformed: {message}")]
    MalformedCredential {
        /// Credential key
        key: String,
        /// Error message
        message: String,
    },

    /// Command needs a section the config does not have
    #[error("config has no [{0}] section")]
    MissingSection(&'static str),
}

impl ConfigError {
    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }

    /// Create a MissingCredential error
    pub fn missing_credential(key: impl Into<String>) -> Self {
        Self::MissingCredential { key: key.into() }
    }

    /// Create a MalformedCredential error
    pub fn malformed_credential(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedCredential {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("sensor", "path", "bucket");
        assert!(err.to_string().contains("sensor"));
        assert!(err.to_string().contains("path"));
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value(
            "sensor",
            "clock",
            "cron_constraint",
            "expected 5 to 7 fields",
        );
        assert!(err.to_string().contains("clock"));
        assert!(err.to_string().contains("cron_constraint"));
    }

    #[test]
    fn test_missing_credential_error() {
        let err = ConfigError::missing_credential("salesforce");
        assert!(err.to_string().contains("'salesforce'"));
    }

    #[test]
    fn test_missing_section() {
        let err = ConfigError::MissingSection("sensor");
        assert!(err.to_string().contains("[sensor]"));
    }
}
