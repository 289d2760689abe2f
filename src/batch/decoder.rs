// In: src/batch/decoder.rs

//! Decodes one serialized result batch into a [`Batch`].
//!
//! **CONTRACT:** decoding is all-or-nothing. Either every row group of the stream
//! decodes and the stream ends with its end-of-stream marker, or a `Format` error
//! is returned that names the failing row group and how far into the input the
//! reader had got. No partially decoded batch is ever handed out.

use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;
use std::sync::Arc;

use arrow::ipc::reader::StreamReader;

use super::accessor::ColumnAccessor;
use super::format::has_end_of_stream_marker;
use super::{Batch, RowGroup};
use crate::error::{Result, RowsetError};
use crate::memory::BufferAllocator;
use crate::types::RowsetSchema;

/// Stateless batch decoder. Cloning is cheap; clones share one allocator.
#[derive(Debug, Clone, Default)]
pub struct BatchDecoder {
    expected: Option<Arc<RowsetSchema>>,
    allocator: BufferAllocator,
}

impl BatchDecoder {
    pub fn new(allocator: BufferAllocator) -> Self {
        Self {
            expected: None,
            allocator,
        }
    }

    /// Rejects any batch whose schema is not compatible with `schema`.
    pub fn with_expected_schema(mut self, schema: Arc<RowsetSchema>) -> Self {
        self.expected = Some(schema);
        self
    }

    pub fn allocator(&self) -> &BufferAllocator {
        &self.allocator
    }

    /// Decodes `bytes` (one complete IPC stream) into a batch.
    pub fn decode(&self, bytes: &[u8]) -> Result<Batch> {
        if bytes.is_empty() {
            return Err(RowsetError::format(None, Some(0), "batch payload is empty"));
        }

        let consumed = Rc::new(Cell::new(0_u64));
        let reader = CountingReader {
            inner: bytes,
            consumed: Rc::clone(&consumed),
        };

        let stream = StreamReader::try_new(reader, None).map_err(|e| {
            RowsetError::format(
                None,
                Some(consumed.get()),
                format!("unreadable stream header: {}", e),
            )
        })?;

        let schema = Arc::new(RowsetSchema::try_from_arrow(&stream.schema())?);
        if let Some(expected) = &self.expected {
            if !schema.is_compatible_with(expected) {
                return Err(RowsetError::format(
                    None,
                    Some(consumed.get()),
                    "batch schema does not match the result schema",
                ));
            }
        }

        let mut row_groups = Vec::new();
        let mut buffer_bytes = 0_usize;
        for (index, item) in stream.enumerate() {
            let record_batch = item.map_err(|e| {
                RowsetError::format(Some(index), Some(consumed.get()), e.to_string())
            })?;

            let accessors = schema
                .columns()
                .iter()
                .zip(record_batch.columns())
                .map(|(descriptor, array)| ColumnAccessor::try_new(descriptor, array))
                .collect::<Result<Vec<_>>>()?;

            buffer_bytes += record_batch.get_array_memory_size();
            row_groups.push(RowGroup {
                accessors,
                num_rows: record_batch.num_rows(),
            });
        }

        // The IPC reader also ends cleanly on EOF at a message boundary, which is
        // exactly how a stream cut between two row groups looks.
        if !has_end_of_stream_marker(bytes) {
            return Err(RowsetError::format(
                Some(row_groups.len()),
                Some(bytes.len() as u64),
                "stream ended without an end-of-stream marker",
            ));
        }

        let reservation = self.allocator.reserve(buffer_bytes)?;
        Ok(Batch::new(schema, row_groups, reservation))
    }
}

/// Counts the bytes pulled out of the wrapped reader.
struct CountingReader<R> {
    inner: R,
    consumed: Rc<Cell<u64>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.set(self.consumed.get() + n as u64);
        Ok(n)
    }
}
