//! Warehouse sink
//!
//! Loads batches into a warehouse table that is dropped and re-created from
//! the source columns in `prepare`. Batches are sent as NDJSON bodies of an
//! `INSERT ... FORMAT JSONEachRow` statement, so omitted (null) fields take
//! the column default of a `Nullable` column.
//!
//! The network side lives behind [`WarehouseClient`]; the ClickHouse HTTP
//! interface is the shipped implementation.

mod clickhouse;

use std::sync::Arc;

use arrival_protocol::{Batch, Column, SourceType, WarehouseTable};
use async_trait::async_trait;

use crate::encode::RowEncoder;
use crate::error::SinkError;
use crate::sink::BatchSink;

pub use clickhouse::{ClickHouseClient, ClickHouseClientConfig, ClickHouseCredentials};

/// Decimal columns without declared precision
const DEFAULT_DECIMAL: (u8, u8) = (38, 9);

/// Statement execution against a warehouse
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Run a statement that returns no rows
    async fn execute(&self, sql: &str) -> Result<(), SinkError>;

    /// Load an NDJSON body into a table
    async fn insert_json_rows(&self, table: &str, body: Vec<u8>) -> Result<(), SinkError>;

    /// Client name for logging
    fn name(&self) -> &'static str;
}

/// Warehouse destination
pub struct WarehouseSink {
    client: Arc<dyn WarehouseClient>,
    table: WarehouseTable,
    encoder: Option<RowEncoder>,
}

impl WarehouseSink {
    pub fn new(client: Arc<dyn WarehouseClient>, table: WarehouseTable) -> Self {
        Self {
            client,
            table,
            encoder: None,
        }
    }

    pub fn table(&self) -> &WarehouseTable {
        &self.table
    }
}

impl BatchSink for WarehouseSink {
    async fn prepare(&mut self, columns: &[Column]) -> Result<(), SinkError> {
        self.client.execute(&drop_table_sql(&self.table)).await?;
        self.client.execute(&create_table_sql(&self.table, columns)).await?;
        self.encoder = Some(RowEncoder::new(columns));
        tracing::info!(
            table = %self.table,
            columns = columns.len(),
            client = self.client.name(),
            "warehouse table re-created"
        );
        Ok(())
    }

    async fn append(&mut self, batch: &Batch) -> Result<(), SinkError> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| SinkError::NotPrepared(self.table.to_string()))?;
        let body = encoder.encode_ndjson(batch.rows())?;
        let bytes = body.len();
        self.client
            .insert_json_rows(&qualified_name(&self.table), body)
            .await?;
        tracing::info!(
            table = %self.table,
            batch = batch.seq(),
            rows = batch.len(),
            bytes,
            "batch loaded"
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.encoder.is_none() {
            return Err(SinkError::NotPrepared(self.table.to_string()));
        }
        tracing::debug!(table = %self.table, "warehouse load complete");
        Ok(())
    }
}

impl std::fmt::Debug for WarehouseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseSink")
            .field("table", &self.table)
            .field("client", &self.client.name())
            .finish()
    }
}

// =============================================================================
// ClickHouse dialect
// =============================================================================

/// ClickHouse column type for a source column
pub fn clickhouse_type(column: &Column) -> String {
    let base = match &column.source_type {
        SourceType::Boolean => "Bool".to_string(),
        SourceType::TinyInt => "Int8".to_string(),
        SourceType::SmallInt => "Int16".to_string(),
        SourceType::Integer => "Int32".to_string(),
        SourceType::BigInt => "Int64".to_string(),
        SourceType::Real => "Float32".to_string(),
        SourceType::Double => "Float64".to_string(),
        SourceType::Decimal { precision, scale } => {
            let (precision, scale) = if *precision == 0 {
                DEFAULT_DECIMAL
            } else {
                (*precision, *scale)
            };
            format!("Decimal({precision}, {scale})")
        }
        SourceType::Date => "Date32".to_string(),
        SourceType::Timestamp => "DateTime64(6)".to_string(),
        SourceType::String
        | SourceType::Guid
        | SourceType::Time
        | SourceType::Binary
        | SourceType::Interval
        | SourceType::Json => "String".to_string(),
    };

    if column.nullable {
        format!("Nullable({base})")
    } else {
        base
    }
}

/// Backtick-quoted identifier
pub fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('\\', "\\\\").replace('`', "\\`"))
}

/// `db`.`table` for a warehouse address
pub fn qualified_name(table: &WarehouseTable) -> String {
    table
        .namespace()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(table.table()))
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

pub fn drop_table_sql(table: &WarehouseTable) -> String {
    format!("DROP TABLE IF EXISTS {}", qualified_name(table))
}

pub fn create_table_sql(table: &WarehouseTable, columns: &[Column]) -> String {
    let fields = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), clickhouse_type(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE {} ({fields}) ENGINE = MergeTree ORDER BY tuple()",
        qualified_name(table)
    )
}
