//! Arrival Sinks - Batch destinations
//!
//! A sink receives the batches of one extraction run in order and marks the
//! destination complete only after all of them were written.
//!
//! ```text
//! [Extraction loop] --Batch--> [Destination] --> object store | warehouse
//! ```
//!
//! # Available Sinks
//!
//! | Destination | URI | Body | Completion |
//! |-------------|-----|------|------------|
//! | `ObjectStoreSink` | `s3://`, `gs://`, `file://`, `memory://` | NDJSON, gzip NDJSON, or Parquet | `_SUCCESS` object |
//! | `WarehouseSink` | `clickhouse://` | `JSONEachRow` insert | none (table re-created up front) |
//!
//! # Example
//!
//! ```ignore
//! use arrival_sinks::{BatchSink, Destination, SinkClients};
//!
//! let mut sink = Destination::open("s3://bucket/out/20230101/", &clients, Compression::Gzip)?;
//! sink.prepare(&columns).await?;
//! sink.append(&batch).await?;
//! sink.finish().await?;
//! ```

pub mod columnar;
pub mod encode;
mod error;
mod sink;
mod store;
pub mod warehouse;

pub use columnar::{arrow_schema, write_parquet};
pub use encode::{RowEncoder, render_text};
pub use error::SinkError;
pub use sink::{BatchSink, Destination, SinkClients};
pub use store::ObjectStoreSink;
pub use warehouse::{
    ClickHouseClient, ClickHouseClientConfig, ClickHouseCredentials, WarehouseClient,
    WarehouseSink, clickhouse_type, create_table_sql,
};
