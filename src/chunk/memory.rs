//! A chunk source over encoded chunks already held in memory.

use std::collections::VecDeque;
use std::time::Instant;

use super::{ChunkSource, ChunkSourceMetrics, MetricsRecorder};
use crate::batch::decoder::BatchDecoder;
use crate::batch::Batch;
use crate::error::{Result, RowsetError};

/// Serves pre-encoded chunks in the order they were given.
#[derive(Debug)]
pub struct InMemoryChunkSource {
    chunks: VecDeque<Vec<u8>>,
    decoder: BatchDecoder,
    next_index: usize,
    recorder: MetricsRecorder,
}

impl InMemoryChunkSource {
    pub fn new(chunks: Vec<Vec<u8>>, decoder: BatchDecoder) -> Self {
        Self {
            chunks: chunks.into(),
            decoder,
            next_index: 0,
            recorder: MetricsRecorder::default(),
        }
    }

    /// Chunks not yet served.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkSource for InMemoryChunkSource {
    fn next_chunk(&mut self) -> Result<Option<Batch>> {
        if self.recorder.is_reported() {
            return Err(RowsetError::ChunkFetch {
                chunk_index: self.next_index,
                message: "chunk source already terminated".into(),
            });
        }
        let started = Instant::now();
        let Some(bytes) = self.chunks.pop_front() else {
            return Ok(None);
        };
        self.recorder.record_wait(started);
        let index = self.next_index;
        self.next_index += 1;

        let batch = self.decoder.decode(&bytes)?;
        self.recorder.record_chunk(bytes.len());
        log::trace!("served in-memory chunk {} ({} rows)", index, batch.num_rows());
        Ok(Some(batch))
    }

    fn terminate(&mut self) -> Option<ChunkSourceMetrics> {
        self.chunks.clear();
        self.recorder.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::encode_int_rows;

    #[test]
    fn test_serves_chunks_in_order_then_exhausts() {
        // 1. Arrange
        let chunks = vec![
            encode_int_rows(&[vec![1, 2, 3]], 2),
            encode_int_rows(&[vec![4]], 2),
        ];
        let mut source = InMemoryChunkSource::new(chunks, BatchDecoder::default());

        // 2. Act
        let first = source.next_chunk().unwrap().unwrap();
        let second = source.next_chunk().unwrap().unwrap();
        let end = source.next_chunk().unwrap();

        // 3. Assert
        assert_eq!(first.num_rows(), 3);
        assert_eq!(first.row_group_count(), 2);
        assert_eq!(second.num_rows(), 1);
        assert!(end.is_none());

        let metrics = source.terminate().unwrap();
        assert_eq!(metrics.chunks_served, 2);
        assert!(metrics.total_bytes > 0);
        assert_eq!(source.terminate(), None);
    }

    #[test]
    fn test_next_chunk_after_terminate_fails() {
        let mut source = InMemoryChunkSource::new(
            vec![encode_int_rows(&[vec![1]], 1)],
            BatchDecoder::default(),
        );
        assert!(source.terminate().is_some());
        assert_eq!(source.remaining(), 0);
        assert!(matches!(
            source.next_chunk(),
            Err(RowsetError::ChunkFetch { chunk_index: 0, .. })
        ));
    }
}
