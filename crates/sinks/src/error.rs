//! Sink error types

use arrival_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while writing batches
#[derive(Debug, Error)]
pub enum SinkError {
    /// Destination URI could not be used
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// `append` or `finish` called before `prepare`
    #[error("sink for '{0}' used before prepare")]
    NotPrepared(String),

    /// Row does not line up with the column list
    #[error("row has {actual} values, expected {expected}")]
    RowWidth { expected: usize, actual: usize },

    /// Value cannot be represented in the column's type
    #[error("column '{column}': {reason}")]
    Encode { column: String, reason: String },

    /// Arrow conversion failed
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet serialization failed
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Local I/O while compressing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NDJSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Object-store write failed
    #[error("object store error at '{location}': {source}")]
    Store {
        location: String,
        #[source]
        source: object_store::Error,
    },

    /// Warehouse could not be reached
    #[error("warehouse connection failed: {0}")]
    Connection(String),

    /// Warehouse rejected a statement
    #[error("warehouse error on '{table}': {message}")]
    Warehouse { table: String, message: String },
}

impl SinkError {
    /// Create an Encode error
    pub fn encode(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Create a Store error
    pub fn store(location: impl Into<String>, source: object_store::Error) -> Self {
        Self::Store {
            location: location.into(),
            source,
        }
    }

    /// Create a Warehouse error
    pub fn warehouse(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warehouse {
            table: table.into(),
            message: message.into(),
        }
    }
}
