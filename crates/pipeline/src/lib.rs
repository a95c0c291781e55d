//! Arrival - Pipeline
//!
//! The extraction loop that moves rows from a source into a destination in
//! bounded batches, and the replication driver that runs it per table.
//!
//! # Architecture
//!
//! ```text
//! [RowSource] --fetch(n)--> [open batch] --append(Batch)--> [BatchSink]
//!                                                  finish() once at the end
//! ```
//!
//! # Key Design
//!
//! - **Sequential**: one fetch or one append in flight at a time
//! - **Bounded memory**: at most one batch of rows is held
//! - **All or nothing**: `finish` only after every append succeeded
//!
//! # Example
//!
//! ```ignore
//! use arrival_pipeline::{ExtractOptions, extract};
//!
//! let summary = extract(&mut source, &mut sink, ExtractOptions::new(100_000, 5_000)).await?;
//! ```

mod error;
mod extract;
mod replicate;
mod report;

pub use error::{ExtractError, ReplicationError, Result};
pub use extract::{ExtractOptions, ExtractSummary, extract};
pub use replicate::{Replication, discover_tables, table_uri};
pub use report::{ReplicationReport, TableOutcome};

#[cfg(test)]
mod testing;
