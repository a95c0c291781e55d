//! Source-side schema description
//!
//! Every source reports its columns as `Column` values. Sinks derive their
//! destination schema and per-column encoders from the declared
//! `SourceType`, never from the runtime values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a source column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal { precision: u8, scale: u8 },
    String,
    Guid,
    Date,
    Time,
    Timestamp,
    Binary,
    Interval,
    Json,
}

impl SourceType {
    /// Whether values are dates, times, or timestamps
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::Timestamp)
    }

    /// Whether values are whole numbers
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt
        )
    }

    /// Lowercase name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Real => "real",
            Self::Double => "double",
            Self::Decimal { .. } => "decimal",
            Self::String => "string",
            Self::Guid => "guid",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Binary => "binary",
            Self::Interval => "interval",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One field of a source row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub source_type: SourceType,
    pub nullable: bool,
}

impl Column {
    /// Create a nullable column
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            nullable: true,
        }
    }

    /// Mark the column as not nullable
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}
