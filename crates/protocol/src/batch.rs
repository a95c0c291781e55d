//! Bounded batches of rows
//!
//! Batches are numbered from 0 within one extraction run; the number is
//! embedded in object names so batches stay orderable.

use crate::value::Row;

/// Ordered rows handed to a sink in one `append`
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    seq: u32,
    rows: Vec<Row>,
}

impl Batch {
    /// Create a batch with its sequence number
    pub fn new(seq: u32, rows: Vec<Row>) -> Self {
        Self { seq, rows }
    }

    /// Sequence number within the run
    #[inline]
    pub fn seq(&self) -> u32 {
        self.seq
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Object name for this batch, e.g. `part-00003.gz`
    pub fn part_name(&self, extension: &str) -> String {
        format!("part-{:05}{}", self.seq, extension)
    }
}
