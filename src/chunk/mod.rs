// In: src/chunk/mod.rs

//! Defines the behavioral contract for anything that supplies result chunks.
//!
//! A `ChunkSource` hides where the remaining batches of a result come from (memory,
//! local files, a pool of background fetchers). The cursor only ever sees the
//! blocking, strictly ordered `next_chunk()` stream and a single `terminate()`.

pub mod file;
pub mod memory;
pub mod prefetch;

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::batch::Batch;
use crate::error::Result;

pub use self::file::FileChunkSource;
pub use self::memory::InMemoryChunkSource;
pub use self::prefetch::{ChunkFetcher, PrefetchingChunkSource};

/// Supplies the decoded batches of a result in server order.
///
/// **CONTRACT:**
/// - `next_chunk` is called sequentially by one consumer. It blocks until the
///   next batch is ready (`Ok(Some)`) or the source is exhausted (`Ok(None)`).
///   Batches are returned in server order, each exactly once.
/// - `terminate` releases everything the source holds and cancels in-flight work.
///   The first call returns the metrics; later calls return `None`.
pub trait ChunkSource: Send {
    fn next_chunk(&mut self) -> Result<Option<Batch>>;
    fn terminate(&mut self) -> Option<ChunkSourceMetrics>;
}

/// Aggregate counters reported once, when a source is terminated.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ChunkSourceMetrics {
    pub chunks_served: u64,
    /// Bytes of encoded chunk data handed to the decoder.
    pub total_bytes: u64,
    /// Time the consumer spent waiting for chunk bytes inside `next_chunk`,
    /// decoding excluded.
    pub total_wait: Duration,
}

/// Accumulates `ChunkSourceMetrics` and hands them out at most once.
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    metrics: ChunkSourceMetrics,
    reported: bool,
}

impl MetricsRecorder {
    pub(crate) fn record_chunk(&mut self, bytes: usize) {
        self.metrics.chunks_served += 1;
        self.metrics.total_bytes += bytes as u64;
    }

    pub(crate) fn record_wait(&mut self, started: Instant) {
        self.metrics.total_wait += started.elapsed();
    }

    pub(crate) fn is_reported(&self) -> bool {
        self.reported
    }

    /// Returns the metrics on the first call and `None` afterwards.
    pub(crate) fn report(&mut self) -> Option<ChunkSourceMetrics> {
        if self.reported {
            return None;
        }
        self.reported = true;
        crate::log_metric!(
            "event" = "chunk_source_terminated",
            "chunks_served" = self.metrics.chunks_served,
            "total_bytes" = self.metrics.total_bytes,
            "total_wait_ms" = self.metrics.total_wait.as_millis()
        );
        Some(std::mem::take(&mut self.metrics))
    }
}
