//! Arrival Protocol - Shared model for sensing and extraction
//!
//! This crate provides the types that cross the boundary between the sensing
//! phase and the extraction phase:
//! - `Precision` / `parse_instance_ts` - Instance timestamps and truncation
//! - `LoadDescriptor` - Parameter bundle handed from detection to extraction
//! - `Column` / `SourceType` - Source-side schema description
//! - `Value` / `Row` / `Batch` - Extracted data in bounded batches
//! - `DestinationUri` - Parsed object-store and warehouse URIs
//!
//! # Wire format
//!
//! Instance timestamps are naive UTC wall-clock values. On the wire (load
//! descriptors, existing-instance lists) they are always rendered as
//! `YYYY-MM-DD HH:MM:SS`.

mod batch;
mod error;
mod instance;
mod load;
mod location;
mod schema;
mod value;

pub use batch::Batch;
pub use error::ProtocolError;
pub use instance::{Precision, format_instance_ts, parse_instance_ts, ts_format};
pub use load::{ExistingInstance, ExistingInstances, LoadDescriptor, NewDataset};
pub use location::{DestinationUri, StorageLocation, StoreScheme, WarehouseTable};
pub use schema::{Column, SourceType};
pub use value::{Row, Value};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Wire format of instance timestamps
pub const INSTANCE_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Name of the completion marker object
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Key suffix identifying manifest objects
pub const MANIFEST_SUFFIX: &str = ".manifest";

#[cfg(test)]
mod location_test;
