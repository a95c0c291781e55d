//! PostgreSQL row source
//!
//! Reads a table or a templated query through a server-side cursor inside a
//! read-only transaction:
//!
//! ```text
//! BEGIN; SET TRANSACTION READ ONLY
//! DECLARE arrival_extract NO SCROLL CURSOR FOR select ... from (<query>) as src
//! FETCH FORWARD n FROM arrival_extract     -- once per fetch
//! CLOSE arrival_extract; COMMIT            -- when a fetch comes back empty
//! ```
//!
//! A failed fetch rolls the transaction back before returning, and dropping
//! an unfinished source queues a rollback, so the pooled connection is clean
//! for the next table.
//!
//! Column types come from `information_schema.columns`. Values without a
//! native decoding (numeric, interval, uuid, arrays, enums) are cast to text
//! in the outer select list, and `timestamptz` is shifted to UTC wall-clock
//! time.

mod template;

use std::time::Duration;

use arrival_config::PostgresSourceConfig;
use arrival_protocol::{Column, LoadDescriptor, Row, SourceType, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor as _, Postgres, Row as _, Transaction};

use crate::error::SourceError;
use crate::traits::{RowSource, TableCatalog};

pub use template::render_query;

const CURSOR: &str = "arrival_extract";

/// Connection secret, stored under the source's `credentials_key`
#[derive(Clone, Deserialize)]
pub struct PostgresCredentials {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

impl std::fmt::Debug for PostgresCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Column read from `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

impl PgColumn {
    pub fn source_type(&self) -> SourceType {
        match self.data_type.as_str() {
            "boolean" => SourceType::Boolean,
            "smallint" => SourceType::SmallInt,
            "integer" => SourceType::Integer,
            "bigint" => SourceType::BigInt,
            "real" => SourceType::Real,
            "double precision" => SourceType::Double,
            "numeric" | "decimal" => {
                let precision = self
                    .numeric_precision
                    .and_then(|p| u8::try_from(p).ok())
                    .filter(|p| *p <= 76);
                match precision {
                    Some(precision) => SourceType::Decimal {
                        precision,
                        scale: self
                            .numeric_scale
                            .and_then(|s| u8::try_from(s).ok())
                            .unwrap_or(0)
                            .min(precision),
                    },
                    None => SourceType::Decimal {
                        precision: 0,
                        scale: 0,
                    },
                }
            }
            "character varying" | "character" | "text" | "name" | "citext" => SourceType::String,
            "uuid" => SourceType::Guid,
            "date" => SourceType::Date,
            "time without time zone" => SourceType::Time,
            "timestamp without time zone" | "timestamp with time zone" => SourceType::Timestamp,
            "bytea" => SourceType::Binary,
            "interval" => SourceType::Interval,
            "json" | "jsonb" => SourceType::Json,
            _ => SourceType::String,
        }
    }

    /// Outer select-list expression producing a decodable value
    pub fn select_expr(&self) -> String {
        let ident = quote_ident(&self.name);
        match self.data_type.as_str() {
            "boolean" | "smallint" | "integer" | "bigint" | "real" | "double precision"
            | "character varying" | "character" | "text" | "date" | "time without time zone"
            | "timestamp without time zone" | "bytea" | "json" | "jsonb" => ident,
            "timestamp with time zone" => format!("({ident} AT TIME ZONE 'UTC') AS {ident}"),
            _ => format!("{ident}::text AS {ident}"),
        }
    }

    pub fn to_column(&self) -> Column {
        Column {
            name: self.name.clone(),
            source_type: self.source_type(),
            nullable: self.nullable,
        }
    }
}

/// Double-quoted identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Connection pool plus the schema tables are looked up in
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
    schema: String,
}

impl PostgresCatalog {
    /// Connect lazily; the first query opens the connection
    pub fn connect(
        config: &PostgresSourceConfig,
        credentials: &PostgresCredentials,
    ) -> Result<Self, SourceError> {
        if config.database.is_empty() {
            return Err(SourceError::Init("postgres source needs a database".into()));
        }
        let options = PgConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.username)
            .password(&credentials.password)
            .database(&config.database)
            .application_name("arrival");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout.max(Duration::from_secs(1)))
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Schema-qualified, quoted table name
    pub fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    /// Column metadata for a table, in ordinal order
    pub async fn describe(&self, table: &str) -> Result<Vec<PgColumn>, SourceError> {
        let rows = sqlx::query(
            r#"
            SELECT column_name::text AS column_name,
                   data_type::text AS data_type,
                   is_nullable::text AS is_nullable,
                   numeric_precision::int4 AS numeric_precision,
                   numeric_scale::int4 AS numeric_scale
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(SourceError::TableNotFound(format!("{}.{table}", self.schema)));
        }

        rows.iter()
            .map(|row| {
                let is_nullable: String = row.try_get("is_nullable")?;
                Ok(PgColumn {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    nullable: is_nullable == "YES",
                    numeric_precision: row.try_get("numeric_precision")?,
                    numeric_scale: row.try_get("numeric_scale")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(SourceError::from)
    }

    /// Read the configured table for one dataset instance
    ///
    /// `custom_sql` is rendered against the load descriptor; without it the
    /// whole table is read.
    pub async fn open_load(
        &self,
        config: &PostgresSourceConfig,
        load: &LoadDescriptor,
    ) -> Result<PostgresSource, SourceError> {
        let table = self.qualified(&config.table);
        let query = match &config.custom_sql {
            Some(template) => render_query(template, &table, load)?,
            None => format!("select * from {table}"),
        };
        let columns = self.describe(&config.table).await?;
        self.open_query(&config.table, &query, columns).await
    }

    async fn open_query(
        &self,
        table: &str,
        query: &str,
        columns: Vec<PgColumn>,
    ) -> Result<PostgresSource, SourceError> {
        let select = columns
            .iter()
            .map(PgColumn::select_expr)
            .collect::<Vec<_>>()
            .join(", ");
        let declare = format!("DECLARE {CURSOR} NO SCROLL CURSOR FOR select {select} from ({query}) as src");

        let mut tx = self.pool.begin().await?;
        (&mut *tx).execute(sqlx::raw_sql("SET TRANSACTION READ ONLY")).await?;
        if let Err(e) = (&mut *tx).execute(sqlx::raw_sql(&declare)).await {
            rollback(table, tx).await;
            return Err(e.into());
        }

        tracing::info!(table, columns = columns.len(), "postgres cursor opened");
        tracing::debug!(sql = %declare, "cursor query");

        Ok(PostgresSource {
            tx: Some(tx),
            table: table.to_string(),
            columns: columns.iter().map(PgColumn::to_column).collect(),
        })
    }
}

impl TableCatalog for PostgresCatalog {
    type Source = PostgresSource;

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self) -> Result<Vec<String>, SourceError> {
        let tables: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn open_table(
        &self,
        table: &str,
        columns: Option<&[String]>,
    ) -> Result<PostgresSource, SourceError> {
        let described = self.describe(table).await?;
        let selected = select_columns(table, described, columns)?;
        let query = format!("select * from {}", self.qualified(table));
        self.open_query(table, &query, selected).await
    }
}

/// Keep the requested columns, in request order
pub fn select_columns(
    table: &str,
    described: Vec<PgColumn>,
    requested: Option<&[String]>,
) -> Result<Vec<PgColumn>, SourceError> {
    let Some(requested) = requested else {
        return Ok(described);
    };

    let missing: Vec<String> = requested
        .iter()
        .filter(|name| !described.iter().any(|c| &c.name == *name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(SourceError::UnknownColumns {
            table: table.to_string(),
            columns: missing,
        });
    }

    Ok(requested
        .iter()
        .filter_map(|name| described.iter().find(|c| &c.name == name).cloned())
        .collect())
}

/// Open cursor over one query
///
/// `tx` is `None` once the cursor was drained or a fetch failed.
pub struct PostgresSource {
    tx: Option<Transaction<'static, Postgres>>,
    table: String,
    columns: Vec<Column>,
}

impl PostgresSource {
    async fn close(&mut self, mut tx: Transaction<'static, Postgres>) -> Result<(), SourceError> {
        (&mut *tx).execute(sqlx::raw_sql(&format!("CLOSE {CURSOR}"))).await?;
        tx.commit().await?;
        tracing::debug!(table = %self.table, "postgres cursor closed");
        Ok(())
    }

    async fn read(
        tx: &mut Transaction<'static, Postgres>,
        columns: &[Column],
        max_rows: usize,
    ) -> Result<Vec<Row>, SourceError> {
        let statement = format!("FETCH FORWARD {} FROM {CURSOR}", max_rows.max(1));
        let rows = (&mut **tx).fetch_all(sqlx::query(&statement)).await?;
        rows.iter().map(|row| decode_row(row, columns)).collect()
    }

    /// Whether the cursor can still return rows
    pub fn is_open(&self) -> bool {
        self.tx.is_some()
    }
}

/// Roll back a transaction whose cursor is unusable
async fn rollback(table: &str, tx: Transaction<'static, Postgres>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(table, error = %e, "postgres rollback failed");
    }
}

impl RowSource for PostgresSource {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>, SourceError> {
        let Some(mut tx) = self.tx.take() else {
            return Ok(Vec::new());
        };

        match Self::read(&mut tx, &self.columns, max_rows).await {
            Ok(rows) if rows.is_empty() => {
                self.close(tx).await?;
                Ok(rows)
            }
            Ok(rows) => {
                self.tx = Some(tx);
                Ok(rows)
            }
            Err(e) => {
                tracing::debug!(table = %self.table, error = %e, "fetch failed, rolling back");
                rollback(&self.table, tx).await;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for PostgresSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSource")
            .field("table", &self.table)
            .field("columns", &self.columns.len())
            .field("open", &self.is_open())
            .finish()
    }
}

fn decode_row(row: &PgRow, columns: &[Column]) -> Result<Row, SourceError> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| decode_value(row, idx, column))
        .collect()
}

fn decode_value(row: &PgRow, idx: usize, column: &Column) -> Result<Value, SourceError> {
    let err = |e: sqlx::Error| SourceError::decode(&column.name, e);
    Ok(match column.source_type {
        SourceType::Boolean => row.try_get::<Option<bool>, _>(idx).map_err(err)?.into(),
        SourceType::TinyInt | SourceType::SmallInt => {
            row.try_get::<Option<i16>, _>(idx).map_err(err)?.into()
        }
        SourceType::Integer => row.try_get::<Option<i32>, _>(idx).map_err(err)?.into(),
        SourceType::BigInt => row.try_get::<Option<i64>, _>(idx).map_err(err)?.into(),
        SourceType::Real => row.try_get::<Option<f32>, _>(idx).map_err(err)?.into(),
        SourceType::Double => row.try_get::<Option<f64>, _>(idx).map_err(err)?.into(),
        SourceType::Date => row.try_get::<Option<NaiveDate>, _>(idx).map_err(err)?.into(),
        SourceType::Time => row.try_get::<Option<NaiveTime>, _>(idx).map_err(err)?.into(),
        SourceType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(idx)
            .map_err(err)?
            .into(),
        SourceType::Binary => row.try_get::<Option<Vec<u8>>, _>(idx).map_err(err)?.into(),
        SourceType::Json => row
            .try_get::<Option<serde_json::Value>, _>(idx)
            .map_err(err)?
            .map_or(Value::Null, Value::Json),
        SourceType::Decimal { .. }
        | SourceType::String
        | SourceType::Guid
        | SourceType::Interval => row.try_get::<Option<String>, _>(idx).map_err(err)?.into(),
    })
}
