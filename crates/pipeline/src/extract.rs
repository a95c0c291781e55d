//! Extraction loop
//!
//! Moves every row of a source into a sink in fixed-size batches:
//!
//! ```text
//! prepare(columns)
//! loop: fetch ≤ fetch_rows → open batch; full batch → append(seq++)
//! exhausted: append remainder (if any) → finish
//! ```
//!
//! A fetch never asks for more than the open batch still holds, so every
//! batch but the last has exactly `batch_rows` rows.

use arrival_config::ExtractConfig;
use arrival_connectors::RowSource;
use arrival_protocol::{Batch, Row};
use arrival_sinks::BatchSink;

use crate::error::Result;

/// Batch and fetch sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    batch_rows: usize,
    fetch_rows: usize,
}

impl ExtractOptions {
    /// Sizes are clamped to at least one row
    pub fn new(batch_rows: usize, fetch_rows: usize) -> Self {
        let batch_rows = batch_rows.max(1);
        Self {
            batch_rows,
            fetch_rows: fetch_rows.clamp(1, batch_rows),
        }
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.batch_rows, config.fetch_rows())
    }

    pub fn batch_rows(&self) -> usize {
        self.batch_rows
    }

    pub fn fetch_rows(&self) -> usize {
        self.fetch_rows
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from_config(&ExtractConfig::default())
    }
}

/// What one run wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub rows: u64,
    pub batches: u32,
}

/// Copy all rows of `source` into `sink`
///
/// `finish` is called only after every `append` succeeded. Any error ends
/// the run without a completion marker.
pub async fn extract<S, K>(source: &mut S, sink: &mut K, options: ExtractOptions) -> Result<ExtractSummary>
where
    S: RowSource,
    K: BatchSink,
{
    sink.prepare(source.columns()).await?;

    let mut summary = ExtractSummary::default();
    let mut open: Vec<Row> = Vec::with_capacity(options.batch_rows);

    loop {
        let want = options.fetch_rows.min(options.batch_rows - open.len());
        let rows = source.fetch(want).await?;
        if rows.is_empty() {
            break;
        }
        open.extend(rows);

        if open.len() >= options.batch_rows {
            let full = std::mem::replace(&mut open, Vec::with_capacity(options.batch_rows));
            append(sink, &mut summary, full).await?;
        }
    }

    if !open.is_empty() {
        append(sink, &mut summary, open).await?;
    }

    sink.finish().await?;
    tracing::info!(rows = summary.rows, batches = summary.batches, "extraction complete");
    Ok(summary)
}

async fn append<K: BatchSink>(sink: &mut K, summary: &mut ExtractSummary, rows: Vec<Row>) -> Result<()> {
    let batch = Batch::new(summary.batches, rows);
    tracing::debug!(batch = batch.seq(), rows = batch.len(), "appending batch");
    sink.append(&batch).await?;
    summary.rows += batch.len() as u64;
    summary.batches += 1;
    Ok(())
}
