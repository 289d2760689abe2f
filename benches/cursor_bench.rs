// In rowset-core/benches/cursor_bench.rs

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Schema};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use rowset::batch::format::{annotated_field, encode_columns};
use rowset::{
    BatchDecoder, InMemoryChunkSource, InlinePayload, LogicalType, ResultCursor,
    ResultDescriptor,
};

const ROWS_PER_BATCH: usize = 4096;
const CHUNK_COUNT: usize = 16;

/// Encodes one batch of an (ID FIXED, NAME TEXT) result.
fn encode_batch(offset: usize) -> Vec<u8> {
    let schema = Arc::new(Schema::new(vec![
        annotated_field(
            "ID",
            DataType::Int64,
            false,
            LogicalType::Fixed {
                precision: Some(18),
                scale: 0,
            },
        ),
        annotated_field("NAME", DataType::Utf8, true, LogicalType::Text),
    ]));
    let ids: Vec<i64> = (offset..offset + ROWS_PER_BATCH).map(|v| v as i64).collect();
    let names: Vec<Option<String>> = ids
        .iter()
        .map(|id| (id % 7 != 0).then(|| format!("row-{}", id)))
        .collect();
    encode_columns(
        &schema,
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(StringArray::from(names)) as ArrayRef,
        ],
        1024,
    )
    .unwrap()
}

fn bench_cursor(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();

    // --- Setup Data ---
    let inline = encode_batch(0);
    let chunks: Vec<Vec<u8>> = (1..=CHUNK_COUNT)
        .map(|i| encode_batch(i * ROWS_PER_BATCH))
        .collect();

    let mut group = c.benchmark_group("Result Cursor");
    group.throughput(Throughput::Elements(
        ((CHUNK_COUNT + 1) * ROWS_PER_BATCH) as u64,
    ));

    group.bench_function("Decode single batch", |b| {
        let decoder = BatchDecoder::default();
        b.iter(|| black_box(decoder.decode(black_box(&inline)).unwrap()))
    });

    group.bench_function("Iterate inline + chunks (get_i64, get_string)", |b| {
        b.iter_batched(
            || {
                let source = InMemoryChunkSource::new(chunks.clone(), BatchDecoder::default());
                ResultCursor::new(
                    ResultDescriptor::inline(InlinePayload::Bytes(inline.clone()))
                        .with_chunks(CHUNK_COUNT, Box::new(source)),
                )
                .unwrap()
            },
            |mut cursor| {
                let mut checksum = 0_i64;
                while cursor.next().unwrap() {
                    checksum += cursor.get_i64(1).unwrap().unwrap_or(0);
                    black_box(cursor.get_string(2).unwrap());
                }
                checksum
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_cursor);
criterion_main!(benches);
