// In: src/batch/mod.rs

//! The decoded, immutable unit of result data.
//!
//! A `Batch` is the output of the [`decoder::BatchDecoder`]: a schema plus one or
//! more row groups whose rows are addressed as one contiguous, zero-based range.
//! The batch owns a memory reservation for its Arrow buffers, so the bytes are
//! accounted for exactly as long as the batch is alive.

pub mod accessor;
pub mod decoder;
pub mod format;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::error::{Result, RowsetError};
use crate::memory::MemoryReservation;
use crate::types::{RowsetSchema, Value};

use self::accessor::ColumnAccessor;

/// One IPC record batch, with an accessor per column.
#[derive(Debug)]
pub(crate) struct RowGroup {
    pub(crate) accessors: Vec<ColumnAccessor>,
    pub(crate) num_rows: usize,
}

#[derive(Debug)]
pub struct Batch {
    schema: Arc<RowsetSchema>,
    row_groups: Vec<RowGroup>,
    /// First batch-level row index of each row group.
    group_starts: Vec<usize>,
    num_rows: usize,
    reservation: MemoryReservation,
}

impl Batch {
    pub(crate) fn new(
        schema: Arc<RowsetSchema>,
        row_groups: Vec<RowGroup>,
        reservation: MemoryReservation,
    ) -> Self {
        let mut group_starts = Vec::with_capacity(row_groups.len());
        let mut num_rows = 0;
        for group in &row_groups {
            group_starts.push(num_rows);
            num_rows += group.num_rows;
        }
        Self {
            schema,
            row_groups,
            group_starts,
            num_rows,
            reservation,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn schema(&self) -> &Arc<RowsetSchema> {
        &self.schema
    }

    /// Bytes reserved for this batch's buffers.
    pub fn byte_size(&self) -> usize {
        self.reservation.size()
    }

    pub fn row_group_count(&self) -> usize {
        self.row_groups.len()
    }

    /// Reads the value at zero-based `column` and batch-level `row`.
    /// `Ok(None)` is SQL NULL.
    pub fn value(&self, column: usize, row: usize) -> Result<Option<Value>> {
        if column >= self.schema.len() {
            return Err(RowsetError::InvalidColumnIndex {
                index: column,
                column_count: self.schema.len(),
            });
        }
        if row >= self.num_rows {
            return Err(RowsetError::InternalError(format!(
                "row {} requested from a batch of {} rows",
                row, self.num_rows
            )));
        }

        // Last group starting at or before `row`; empty groups are skipped over.
        let group_index = self.group_starts.partition_point(|&start| start <= row) - 1;
        let group = &self.row_groups[group_index];
        let accessor = group.accessors.get(column).ok_or_else(|| {
            RowsetError::InternalError(format!(
                "row group {} has no accessor for column {}",
                group_index, column
            ))
        })?;
        accessor
            .value_at(row - self.group_starts[group_index])
            .map_err(|e| match e {
                RowsetError::Format {
                    byte_offset,
                    message,
                    ..
                } => RowsetError::Format {
                    row_group: Some(group_index),
                    byte_offset,
                    message,
                },
                other => other,
            })
    }
}
