//! Source trait definitions

use std::future::Future;

use arrival_protocol::{Column, Row};

use crate::error::SourceError;

/// An open, forward-only read of one table or query
///
/// Rows come back in the order of `columns()`. Each `fetch` is one bounded
/// round trip; an empty result means the source is exhausted and every later
/// call returns empty as well.
pub trait RowSource: Send {
    /// Columns of every returned row
    fn columns(&self) -> &[Column];

    /// Read up to `max_rows` rows
    fn fetch(
        &mut self,
        max_rows: usize,
    ) -> impl Future<Output = Result<Vec<Row>, SourceError>> + Send;
}

/// A source holding many tables
pub trait TableCatalog: Send + Sync {
    type Source: RowSource;

    /// Catalog name for logging (e.g., "postgres", "salesforce")
    fn name(&self) -> &'static str;

    /// Names of all tables in the catalog
    fn list_tables(&self) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;

    /// Open a read of `table`, restricted to `columns` when given
    fn open_table(
        &self,
        table: &str,
        columns: Option<&[String]>,
    ) -> impl Future<Output = Result<Self::Source, SourceError>> + Send;
}
