//! Pipeline error types

use arrival_connectors::SourceError;
use arrival_sinks::SinkError;
use thiserror::Error;

/// Errors that end one extraction run
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading from the source failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Writing to the destination failed; no completion marker was written
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors that end a multi-table replication run
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Table list could not be read
    #[error("cannot list tables: {0}")]
    Catalog(#[source] SourceError),

    /// A destination failed; later tables were not attempted
    #[error("destination for table '{table}' failed: {source}")]
    Sink {
        table: String,
        #[source]
        source: SinkError,
    },

    /// Mandatory tables failed after every table was attempted
    #[error("the following mandatory tables failed to load: {}", tables.join(", "))]
    MandatoryFailed { tables: Vec<String> },
}

/// Result type for extraction
pub type Result<T> = std::result::Result<T, ExtractError>;
