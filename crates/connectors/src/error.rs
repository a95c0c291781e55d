//! Error types for row sources

use arrival_config::ConfigError;
use thiserror::Error;

/// Errors that can occur while listing, describing, or reading a source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to initialize a client
    #[error("failed to initialize source: {0}")]
    Init(String),

    /// Source configuration or credentials are unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Table does not exist
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Table exists but cannot be queried
    #[error("table '{0}' is not queryable")]
    NotQueryable(String),

    /// Requested columns are not in the table
    #[error("columns {columns:?} do not exist in table '{table}'")]
    UnknownColumns { table: String, columns: Vec<String> },

    /// Query template references something unavailable
    #[error("cannot render query template: {0}")]
    Template(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Remote API returned an error status
    #[error("{context} failed with status {status}: {message}")]
    Api {
        context: String,
        status: u16,
        message: String,
    },

    /// Value could not be decoded into the column's type
    #[error("column '{column}': {reason}")]
    Decode { column: String, reason: String },

    /// HTTP request failed
    #[cfg(feature = "salesforce")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Database call failed
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON parsing failed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SourceError {
    /// Create a Decode error
    pub fn decode(column: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an Api error
    pub fn api(context: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            context: context.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether the table can never be read, as opposed to a failed read
    pub fn is_not_queryable(&self) -> bool {
        matches!(self, Self::NotQueryable(_))
    }
}
