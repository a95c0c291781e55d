//! Storage and warehouse URIs
//!
//! Object stores are addressed as `scheme://bucket/prefix`, warehouse tables
//! as `scheme://authority/namespace.../table`. `DestinationUri::parse` is the
//! single place where a scheme is mapped to a kind of destination.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Object-store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScheme {
    /// Amazon S3 (`s3://`)
    S3,
    /// Google Cloud Storage (`gs://`)
    Gcs,
    /// Local filesystem (`file://`)
    File,
    /// Process-local in-memory store (`memory://`)
    Memory,
}

impl StoreScheme {
    /// URI scheme
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Gcs => "gs",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }

    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "s3" => Some(Self::S3),
            "gs" => Some(Self::Gcs),
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// A bucket and key prefix in an object store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocation {
    scheme: StoreScheme,
    bucket: String,
    prefix: String,
}

impl StorageLocation {
    /// Create a location from parts
    pub fn new(scheme: StoreScheme, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            scheme,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn scheme(&self) -> StoreScheme {
        self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix, as configured (may or may not end with `/`)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full key of an object directly under this prefix
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Location of a subfolder, always ending with `/`
    pub fn child(&self, name: &str) -> Self {
        let mut prefix = self.key(name);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            scheme: self.scheme,
            bucket: self.bucket.clone(),
            prefix,
        }
    }

    /// Prefix with a trailing `/`, for keys written below this location
    pub fn as_folder(&self) -> Self {
        if self.prefix.is_empty() || self.prefix.ends_with('/') {
            self.clone()
        } else {
            self.child("")
        }
    }

    /// Render as `scheme://bucket/prefix`
    pub fn uri(&self) -> String {
        format!("{}://{}/{}", self.scheme.as_str(), self.bucket, self.prefix)
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl FromStr for StorageLocation {
    type Err = ProtocolError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = split_scheme(uri)?;
        let scheme = StoreScheme::from_scheme(scheme)
            .ok_or_else(|| ProtocolError::unknown_scheme(scheme, uri))?;

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        // file:///abs/path has an empty authority
        if bucket.is_empty() && scheme != StoreScheme::File {
            return Err(ProtocolError::malformed_uri(uri, "missing bucket"));
        }

        Ok(Self::new(scheme, bucket, prefix))
    }
}

/// A warehouse table address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseTable {
    scheme: String,
    authority: String,
    namespace: Vec<String>,
    table: String,
}

impl WarehouseTable {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host (and port) or project
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Path segments between the authority and the table
    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Address of a sibling table in the same namespace
    pub fn with_table(&self, table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for WarehouseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)?;
        for segment in &self.namespace {
            write!(f, "/{segment}")?;
        }
        write!(f, "/{}", self.table)
    }
}

impl FromStr for WarehouseTable {
    type Err = ProtocolError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = split_scheme(uri)?;
        let mut parts = rest.trim_end_matches('/').split('/');

        let authority = parts.next().unwrap_or_default();
        if authority.is_empty() {
            return Err(ProtocolError::malformed_uri(uri, "missing host or project"));
        }

        let mut segments: Vec<String> = parts.map(str::to_string).collect();
        if segments.len() < 2 || segments.iter().any(String::is_empty) {
            return Err(ProtocolError::malformed_uri(
                uri,
                "expected at least a namespace and a table after the authority",
            ));
        }
        let table = segments.pop().unwrap_or_default();

        Ok(Self {
            scheme: scheme.to_string(),
            authority: authority.to_string(),
            namespace: segments,
            table,
        })
    }
}

/// A parsed destination URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationUri {
    /// Batches are uploaded as objects below a prefix
    ObjectStore(StorageLocation),
    /// Batches are loaded into a warehouse table
    Warehouse(WarehouseTable),
}

impl DestinationUri {
    /// Parse a destination URI, rejecting unknown schemes
    pub fn parse(uri: &str) -> Result<Self, ProtocolError> {
        let (scheme, _) = split_scheme(uri)?;
        match scheme {
            "s3" | "gs" | "file" | "memory" => Ok(Self::ObjectStore(uri.parse()?)),
            "clickhouse" => Ok(Self::Warehouse(uri.parse()?)),
            other => Err(ProtocolError::unknown_scheme(other, uri)),
        }
    }
}

impl fmt::Display for DestinationUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectStore(location) => fmt::Display::fmt(location, f),
            Self::Warehouse(table) => fmt::Display::fmt(table, f),
        }
    }
}

fn split_scheme(uri: &str) -> Result<(&str, &str), ProtocolError> {
    match uri.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() => Ok((scheme, rest)),
        _ => Err(ProtocolError::malformed_uri(uri, "expected scheme://...")),
    }
}
