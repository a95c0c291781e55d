//! In-memory sources and sinks for tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use arrival_connectors::{RowSource, SourceError, TableCatalog};
use arrival_protocol::{Batch, Column, Row, SourceType, Value};
use arrival_sinks::{BatchSink, SinkError};

/// Rows served from memory, optionally failing after some fetches
pub struct MemorySource {
    columns: Vec<Column>,
    rows: VecDeque<Row>,
    fetches: usize,
    fail_after_fetches: Option<usize>,
    pub requested: Vec<usize>,
}

impl MemorySource {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            fetches: 0,
            fail_after_fetches: None,
            requested: Vec::new(),
        }
    }

    /// Single integer column `id` with values `0..n`
    pub fn counting(n: i64) -> Self {
        Self::new(
            vec![Column::new("id", SourceType::BigInt).required()],
            (0..n).map(|i| vec![Value::Int(i)]).collect(),
        )
    }

    pub fn failing_after(mut self, fetches: usize) -> Self {
        self.fail_after_fetches = Some(fetches);
        self
    }
}

impl RowSource for MemorySource {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>, SourceError> {
        self.requested.push(max_rows);
        if self.fail_after_fetches == Some(self.fetches) {
            return Err(SourceError::Api {
                context: "fetch".into(),
                status: 500,
                message: "connection reset".into(),
            });
        }
        self.fetches += 1;
        let take = max_rows.min(self.rows.len());
        Ok(self.rows.drain(..take).collect())
    }
}

/// Everything a sink was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Prepare(Vec<String>),
    Append { seq: u32, rows: usize },
    Finish,
}

/// Sink that records calls; shared log so tests can inspect after the move
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub calls: Arc<Mutex<Vec<SinkCall>>>,
    pub fail_on_append: Option<u32>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_append(seq: u32) -> Self {
        Self {
            fail_on_append: Some(seq),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Append { rows, .. } => Some(rows),
                _ => None,
            })
            .collect()
    }
}

impl BatchSink for RecordingSink {
    async fn prepare(&mut self, columns: &[Column]) -> Result<(), SinkError> {
        let names = columns.iter().map(|c| c.name.clone()).collect();
        self.calls.lock().unwrap().push(SinkCall::Prepare(names));
        Ok(())
    }

    async fn append(&mut self, batch: &Batch) -> Result<(), SinkError> {
        if self.fail_on_append == Some(batch.seq()) {
            return Err(SinkError::Connection("upload failed".into()));
        }
        self.calls.lock().unwrap().push(SinkCall::Append {
            seq: batch.seq(),
            rows: batch.len(),
        });
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(SinkCall::Finish);
        Ok(())
    }
}

/// How a catalog table behaves when opened
pub enum TableKind {
    Rows(i64),
    NotQueryable,
    OpenFails,
    FailsMidway,
}

/// Catalog over in-memory tables
#[derive(Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, TableKind>,
    pub opened: Mutex<Vec<(String, Option<Vec<String>>)>>,
}

impl MemoryCatalog {
    pub fn with(mut self, table: &str, kind: TableKind) -> Self {
        self.tables.insert(table.to_string(), kind);
        self
    }
}

impl TableCatalog for MemoryCatalog {
    type Source = MemorySource;

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn open_table(
        &self,
        table: &str,
        columns: Option<&[String]>,
    ) -> Result<MemorySource, SourceError> {
        self.opened
            .lock()
            .unwrap()
            .push((table.to_string(), columns.map(<[String]>::to_vec)));
        match self.tables.get(table) {
            None => Err(SourceError::TableNotFound(table.to_string())),
            Some(TableKind::Rows(n)) => Ok(MemorySource::counting(*n)),
            Some(TableKind::NotQueryable) => Err(SourceError::NotQueryable(table.to_string())),
            Some(TableKind::OpenFails) => Err(SourceError::AuthFailed("permission denied".into())),
            Some(TableKind::FailsMidway) => Ok(MemorySource::counting(10).failing_after(1)),
        }
    }
}
