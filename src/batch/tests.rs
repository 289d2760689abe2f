use super::decoder::BatchDecoder;
use super::format::{annotated_field, encode_columns, write_ipc_stream, END_OF_STREAM_MARKER};
use super::*;
use crate::memory::BufferAllocator;
use crate::testing::{encode_int_rows, int_schema, random_int_columns};
use crate::types::LogicalType;
use arrow::array::{ArrayRef, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

fn text_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        annotated_field(
            "ID",
            DataType::Int32,
            false,
            LogicalType::Fixed {
                precision: None,
                scale: 0,
            },
        ),
        annotated_field("NAME", DataType::Utf8, true, LogicalType::Text),
    ]))
}

#[test]
fn test_decodes_random_rows_across_row_groups() {
    // 1. Arrange: 1000 rows, 10 per row group.
    let columns = random_int_columns(42, 1, 1000);
    let bytes = encode_int_rows(&columns, 10);

    // 2. Act
    let batch = BatchDecoder::default().decode(&bytes).unwrap();

    // 3. Assert
    assert_eq!(batch.num_rows(), 1000);
    assert_eq!(batch.row_group_count(), 100);
    assert_eq!(batch.schema().len(), 1);
    for (row, expected) in columns[0].iter().enumerate() {
        assert_eq!(
            batch.value(0, row).unwrap(),
            Some(Value::Integer(i64::from(*expected)))
        );
    }
}

#[test]
fn test_nullable_text_column() {
    let schema = text_schema();
    let bytes = encode_columns(
        &schema,
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])) as ArrayRef,
            Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])) as ArrayRef,
        ],
        2,
    )
    .unwrap();

    let batch = BatchDecoder::default().decode(&bytes).unwrap();

    assert_eq!(batch.value(1, 0).unwrap(), Some(Value::Text("a".into())));
    assert_eq!(batch.value(1, 1).unwrap(), None);
    assert_eq!(batch.value(1, 2).unwrap(), Some(Value::Text("c".into())));
    assert!(batch.schema().column(1).unwrap().nullable);
}

#[test]
fn test_empty_row_groups_are_skipped_when_addressing_rows() {
    let schema = int_schema(1);
    let groups = vec![
        RecordBatch::try_new(
            Arc::clone(&schema),
            vec![Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef],
        )
        .unwrap(),
        RecordBatch::new_empty(Arc::clone(&schema)),
        RecordBatch::try_new(
            Arc::clone(&schema),
            vec![Arc::new(Int32Array::from(vec![3])) as ArrayRef],
        )
        .unwrap(),
    ];
    let bytes = write_ipc_stream(&schema, &groups).unwrap();

    let batch = BatchDecoder::default().decode(&bytes).unwrap();

    assert_eq!(batch.num_rows(), 3);
    assert_eq!(batch.row_group_count(), 3);
    assert_eq!(batch.value(0, 2).unwrap(), Some(Value::Integer(3)));
    assert!(matches!(
        batch.value(0, 3),
        Err(RowsetError::InternalError(_))
    ));
    assert!(matches!(
        batch.value(1, 0),
        Err(RowsetError::InvalidColumnIndex {
            index: 1,
            column_count: 1
        })
    ));
}

#[test]
fn test_truncated_body_names_row_group_and_offset() {
    // 1. Arrange: cut the stream in the middle of its body.
    let bytes = encode_int_rows(&random_int_columns(7, 2, 100), 10);
    let truncated = &bytes[..bytes.len() / 2];

    // 2. Act
    let result = BatchDecoder::default().decode(truncated);

    // 3. Assert
    match result {
        Err(RowsetError::Format {
            row_group: Some(group),
            byte_offset: Some(offset),
            ..
        }) => {
            assert!(group < 10);
            assert!(offset <= truncated.len() as u64);
        }
        other => panic!("expected a located Format error, got {:?}", other),
    }
}

#[test]
fn test_missing_end_of_stream_marker_is_truncation() {
    let bytes = encode_int_rows(&[vec![1, 2, 3, 4]], 2);
    let without_marker = &bytes[..bytes.len() - END_OF_STREAM_MARKER.len()];

    let result = BatchDecoder::default().decode(without_marker);

    assert!(matches!(
        result,
        Err(RowsetError::Format {
            row_group: Some(2),
            ..
        })
    ));
}

#[test]
fn test_garbage_and_empty_input() {
    let decoder = BatchDecoder::default();
    // A continuation marker announcing 16 bytes of metadata, followed by three.
    let garbage = [0xFF, 0xFF, 0xFF, 0xFF, 0x10, 0x00, 0x00, 0x00, 1, 2, 3];
    assert!(matches!(
        decoder.decode(&garbage),
        Err(RowsetError::Format { .. })
    ));
    assert!(matches!(
        decoder.decode(&[]),
        Err(RowsetError::Format {
            byte_offset: Some(0),
            ..
        })
    ));
}

#[test]
fn test_expected_schema_mismatch_is_a_format_error() {
    let expected = Arc::new(
        crate::types::RowsetSchema::try_from_arrow(&int_schema(2)).unwrap(),
    );
    let decoder = BatchDecoder::default().with_expected_schema(expected);

    let compatible = encode_int_rows(&[vec![1], vec![2]], 1);
    assert!(decoder.decode(&compatible).is_ok());

    let narrower = encode_int_rows(&[vec![1]], 1);
    assert!(matches!(
        decoder.decode(&narrower),
        Err(RowsetError::Format { .. })
    ));
}

#[test]
fn test_undeclared_logical_type_is_unsupported() {
    let schema = Arc::new(Schema::new(vec![Field::new("RAW", DataType::Int32, false)]));
    let bytes = encode_columns(
        &schema,
        vec![Arc::new(Int32Array::from(vec![1])) as ArrayRef],
        1,
    )
    .unwrap();

    let result = BatchDecoder::default().decode(&bytes);

    assert!(matches!(result, Err(RowsetError::UnsupportedType(_))));
}

#[test]
fn test_reservation_is_held_for_batch_lifetime() {
    let allocator = BufferAllocator::new();
    let decoder = BatchDecoder::new(allocator.clone());

    let batch = decoder
        .decode(&encode_int_rows(&random_int_columns(1, 1, 500), 50))
        .unwrap();
    assert!(batch.byte_size() > 0);
    assert_eq!(allocator.reserved(), batch.byte_size());

    drop(batch);
    assert_eq!(allocator.reserved(), 0);
}

#[test]
fn test_memory_limit_rejects_large_batch() {
    let allocator = BufferAllocator::with_limit(64);
    let decoder = BatchDecoder::new(allocator.clone());

    let result = decoder.decode(&encode_int_rows(&random_int_columns(3, 4, 1000), 100));

    assert!(matches!(
        result,
        Err(RowsetError::MemoryLimitExceeded { limit: 64, .. })
    ));
    assert_eq!(allocator.reserved(), 0);
}
