//! Extraction, destination and storage configuration

use std::time::Duration;

use serde::Deserialize;

/// Encoding applied to object-store batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain NDJSON
    None,
    /// Gzip-compressed NDJSON (default)
    #[default]
    #[serde(alias = "gz")]
    Gzip,
    /// Parquet with a schema derived from the source columns
    Parquet,
}

/// Extraction loop settings
///
/// # Example
///
/// ```toml
/// [extract]
/// batch_rows = 50000
/// compression = "parquet"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Rows per uploaded batch
    /// Default: 100000
    pub batch_rows: usize,

    /// Rows requested per source fetch
    /// Default: batch_rows / 20
    pub fetch_rows: Option<usize>,

    /// Default: gzip
    pub compression: Compression,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            batch_rows: 100_000,
            fetch_rows: None,
            compression: Compression::Gzip,
        }
    }
}

impl ExtractConfig {
    /// Effective fetch size, never zero
    pub fn fetch_rows(&self) -> usize {
        self.fetch_rows.unwrap_or(self.batch_rows / 20).max(1)
    }
}

/// Warehouse client settings
///
/// The target host comes from the destination URI; this section only
/// carries what the URI cannot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Credential with `username` and `password`; anonymous when absent
    pub credentials_key: Option<String>,

    /// Use https for the HTTP interface
    /// Default: false
    pub secure: bool,

    /// Request timeout
    /// Default: 300s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            credentials_key: None,
            secure: false,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Object-store client settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Credential with `key` and `skey`; ambient credentials when absent
    pub credentials_key: Option<String>,

    /// Region for S3 buckets
    pub region: Option<String>,

    /// Bill listing and reads to the requester (S3 requester-pays buckets)
    /// Default: false
    pub request_payer: bool,
}
