//! Multi-table replication
//!
//! Copies a list of tables one at a time, each to `<base_uri><table>/`.
//! Source failures are recorded and the run moves on; a destination failure
//! stops the run. Mandatory tables are checked only after every table was
//! attempted.

use std::collections::HashMap;

use arrival_config::{ExtractConfig, SalesforceSourceConfig};
use arrival_connectors::{SourceError, TableCatalog, TableFilter};
use arrival_sinks::{BatchSink, SinkError};

use crate::error::{ExtractError, ReplicationError};
use crate::extract::{ExtractOptions, extract};
use crate::report::{ReplicationReport, TableOutcome};

/// What to copy and which failures are fatal
#[derive(Debug, Clone, Default)]
pub struct Replication {
    pub options: ExtractOptions,
    /// Column selection per table; all columns when absent
    pub table_columns: HashMap<String, Vec<String>>,
    pub mandatory_tables: Vec<String>,
}

impl Replication {
    pub fn from_config(source: &SalesforceSourceConfig, extract: &ExtractConfig) -> Self {
        Self {
            options: ExtractOptions::from_config(extract),
            table_columns: source
                .table_details
                .iter()
                .filter_map(|(table, details)| {
                    details.columns.clone().map(|columns| (table.clone(), columns))
                })
                .collect(),
            mandatory_tables: source.mandatory_tables.clone(),
        }
    }

    /// Replicate `tables` in order
    ///
    /// `open_sink` receives the table name and its destination URI.
    ///
    /// # Errors
    ///
    /// Returns `Sink` on the first destination failure, or `MandatoryFailed`
    /// when reading any mandatory table failed. A mandatory table the source
    /// cannot query is only recorded.
    pub async fn run<C, K, F>(
        &self,
        catalog: &C,
        tables: &[String],
        base_uri: &str,
        mut open_sink: F,
    ) -> Result<ReplicationReport, ReplicationError>
    where
        C: TableCatalog,
        K: BatchSink,
        F: FnMut(&str, &str) -> Result<K, SinkError>,
    {
        let mut report = ReplicationReport::new();

        for (i, table) in tables.iter().enumerate() {
            tracing::info!(catalog = catalog.name(), table = %table, index = i, total = tables.len(), "processing table");

            let columns = self.table_columns.get(table).map(Vec::as_slice);
            let mut source = match catalog.open_table(table, columns).await {
                Ok(source) => source,
                Err(e) => {
                    report.record(table, source_outcome(table, e));
                    continue;
                }
            };

            let uri = table_uri(base_uri, table);
            let mut sink = open_sink(table, &uri).map_err(|source| ReplicationError::Sink {
                table: table.clone(),
                source,
            })?;

            match extract(&mut source, &mut sink, self.options).await {
                Ok(summary) => {
                    tracing::info!(table = %table, destination = %uri, rows = summary.rows, "table loaded");
                    report.record(table, TableOutcome::Loaded(summary));
                }
                Err(ExtractError::Source(e)) => report.record(table, source_outcome(table, e)),
                Err(ExtractError::Sink(source)) => {
                    return Err(ReplicationError::Sink {
                        table: table.clone(),
                        source,
                    });
                }
            }
        }

        tracing::info!(
            loaded = report.loaded().len(),
            failed = report.failed().len(),
            not_queryable = report.not_queryable().len(),
            "replication finished"
        );

        let failed = report.failed_mandatory(&self.mandatory_tables);
        if !failed.is_empty() {
            return Err(ReplicationError::MandatoryFailed { tables: failed });
        }
        Ok(report)
    }
}

/// List the catalog's tables through a filter
pub async fn discover_tables<C: TableCatalog>(
    catalog: &C,
    filter: &TableFilter,
) -> Result<Vec<String>, ReplicationError> {
    let tables = catalog.list_tables().await.map_err(ReplicationError::Catalog)?;
    let total = tables.len();
    let kept = filter.apply(tables);
    tracing::info!(catalog = catalog.name(), total, selected = kept.len(), "tables discovered");
    Ok(kept)
}

/// Destination of one table below a base URI
pub fn table_uri(base_uri: &str, table: &str) -> String {
    let sep = if base_uri.ends_with('/') { "" } else { "/" };
    format!("{base_uri}{sep}{table}/")
}

fn source_outcome(table: &str, error: SourceError) -> TableOutcome {
    if error.is_not_queryable() {
        tracing::warn!(table, "table is not queryable, skipping");
        TableOutcome::NotQueryable
    } else {
        tracing::warn!(table, error = %error, "table failed to load");
        TableOutcome::Failed(error.to_string())
    }
}
