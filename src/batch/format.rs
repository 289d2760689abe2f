// In: src/batch/format.rs

//! Defines the wire contract of a result batch.
//!
//! A batch is an Arrow IPC *stream*: a schema message, zero or more record-batch
//! messages (the row groups) and an end-of-stream marker. The logical meaning of
//! each column travels in the field metadata under the keys below. This module
//! also carries the writer half used to produce fixtures and benchmark inputs.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;

use crate::error::{Result, RowsetError};
use crate::types::LogicalType;

//==================================================================================
// I. Metadata Keys
//==================================================================================

/// Field metadata key naming the logical type (`FIXED`, `TEXT`, ...).
pub const LOGICAL_TYPE_KEY: &str = "logicalType";
/// Field metadata key holding the decimal / fractional-second scale.
pub const SCALE_KEY: &str = "scale";
/// Field metadata key holding the declared numeric precision.
pub const PRECISION_KEY: &str = "precision";

//==================================================================================
// II. Stream Framing
//==================================================================================

/// The end-of-stream marker: continuation token followed by a zero length.
/// A stream that does not end with it was cut short.
pub const END_OF_STREAM_MARKER: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00];

/// Returns `true` if `bytes` ends with a complete end-of-stream marker.
pub fn has_end_of_stream_marker(bytes: &[u8]) -> bool {
    bytes.ends_with(&END_OF_STREAM_MARKER)
}

//==================================================================================
// III. Writer Helpers
//==================================================================================

/// Builds a field carrying the metadata for `logical_type`.
pub fn annotated_field(
    name: &str,
    physical: DataType,
    nullable: bool,
    logical_type: LogicalType,
) -> Field {
    Field::new(name, physical, nullable).with_metadata(logical_type.to_metadata())
}

/// Splits `columns` into row groups of at most `rows_per_group` rows and encodes
/// them as one IPC stream.
pub fn encode_columns(
    schema: &SchemaRef,
    columns: Vec<ArrayRef>,
    rows_per_group: usize,
) -> Result<Vec<u8>> {
    if rows_per_group == 0 {
        return Err(RowsetError::Config("rows_per_group must be positive".into()));
    }
    let full = RecordBatch::try_new(Arc::clone(schema), columns)?;
    let mut groups = Vec::new();
    let mut offset = 0;
    while offset < full.num_rows() {
        let len = rows_per_group.min(full.num_rows() - offset);
        groups.push(full.slice(offset, len));
        offset += len;
    }
    write_ipc_stream(schema, &groups)
}

/// Writes `batches` as an IPC stream with `schema` in its header.
pub fn write_ipc_stream(schema: &Schema, batches: &[RecordBatch]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buffer, schema)?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.finish()?;
    }
    Ok(buffer)
}
