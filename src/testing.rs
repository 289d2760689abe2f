//! Fixtures shared by the unit test suites.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Int32Array};
use arrow::datatypes::{DataType, Schema, SchemaRef};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::batch::decoder::BatchDecoder;
use crate::batch::format::{annotated_field, encode_columns};
use crate::batch::Batch;
use crate::chunk::{ChunkSource, ChunkSourceMetrics};
use crate::error::Result;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::types::LogicalType;

/// A schema of `columns` non-null INT columns named `C1`, `C2`, ...
pub(crate) fn int_schema(columns: usize) -> SchemaRef {
    let fields = (1..=columns)
        .map(|i| {
            annotated_field(
                &format!("C{}", i),
                DataType::Int32,
                false,
                LogicalType::Fixed {
                    precision: Some(38),
                    scale: 0,
                },
            )
        })
        .collect::<Vec<_>>();
    Arc::new(Schema::new(fields))
}

/// Encodes column-major integer data into one batch.
pub(crate) fn encode_int_rows(columns: &[Vec<i32>], rows_per_group: usize) -> Vec<u8> {
    let schema = int_schema(columns.len());
    let arrays = columns
        .iter()
        .map(|values| Arc::new(Int32Array::from(values.clone())) as ArrayRef)
        .collect();
    encode_columns(&schema, arrays, rows_per_group).unwrap()
}

/// Seeded random column-major integer data.
pub(crate) fn random_int_columns(seed: u64, columns: usize, rows: usize) -> Vec<Vec<i32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..columns)
        .map(|_| (0..rows).map(|_| rng.random::<i32>()).collect())
        .collect()
}

/// Chunk `chunk` of a grid result: cell (row, column) holds `chunk * 1000 + column * 500 + row`.
pub(crate) fn grid_chunk(chunk: usize, rows: usize, columns: usize) -> Vec<u8> {
    let data = (0..columns)
        .map(|column| {
            (0..rows)
                .map(|row| (chunk * 1000 + column * 500 + row) as i32)
                .collect()
        })
        .collect::<Vec<Vec<i32>>>();
    encode_int_rows(&data, 100)
}

/// Records every telemetry event it receives.
#[derive(Default)]
pub(crate) struct RecordingTelemetry {
    pub(crate) events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub(crate) fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Replays a fixed script of encoded chunks and failures, counting calls.
pub(crate) struct ScriptedChunkSource {
    script: VecDeque<Result<Vec<u8>>>,
    decoder: BatchDecoder,
    pub(crate) pulls: Arc<AtomicUsize>,
    pub(crate) terminations: Arc<AtomicUsize>,
    served: u64,
}

impl ScriptedChunkSource {
    pub(crate) fn new(script: Vec<Result<Vec<u8>>>, decoder: BatchDecoder) -> Self {
        Self {
            script: script.into(),
            decoder,
            pulls: Arc::new(AtomicUsize::new(0)),
            terminations: Arc::new(AtomicUsize::new(0)),
            served: 0,
        }
    }
}

impl ChunkSource for ScriptedChunkSource {
    fn next_chunk(&mut self) -> Result<Option<Batch>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            None => Ok(None),
            Some(step) => {
                let batch = self.decoder.decode(&step?)?;
                self.served += 1;
                Ok(Some(batch))
            }
        }
    }

    fn terminate(&mut self) -> Option<ChunkSourceMetrics> {
        let previous = self.terminations.fetch_add(1, Ordering::SeqCst);
        (previous == 0).then(|| ChunkSourceMetrics {
            chunks_served: self.served,
            ..ChunkSourceMetrics::default()
        })
    }
}
