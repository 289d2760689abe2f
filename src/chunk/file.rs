// In: src/chunk/file.rs

//! A chunk source reading locally cached chunk files.
//!
//! Each file holds one encoded batch, either as-is or wrapped in a single zstd
//! frame (`ChunkEncoding::Zstd`). Files are opened lazily, one per `next_chunk`
//! call, in the order the paths were given.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use super::{ChunkSource, ChunkSourceMetrics, MetricsRecorder};
use crate::batch::decoder::BatchDecoder;
use crate::batch::Batch;
use crate::config::{ChunkEncoding, RowsetConfig};
use crate::error::{Result, RowsetError};

#[derive(Debug)]
pub struct FileChunkSource {
    paths: Vec<PathBuf>,
    encoding: ChunkEncoding,
    decoder: BatchDecoder,
    next_index: usize,
    recorder: MetricsRecorder,
}

impl FileChunkSource {
    pub fn new(paths: Vec<PathBuf>, encoding: ChunkEncoding, decoder: BatchDecoder) -> Self {
        Self {
            paths,
            encoding,
            decoder,
            next_index: 0,
            recorder: MetricsRecorder::default(),
        }
    }

    /// A source reading `paths` with the configured `chunk_encoding`.
    pub fn from_config(
        paths: Vec<PathBuf>,
        decoder: BatchDecoder,
        config: &RowsetConfig,
    ) -> Self {
        Self::new(paths, config.chunk_encoding, decoder)
    }

    fn read_chunk(&self, index: usize) -> Result<Vec<u8>> {
        let path = &self.paths[index];
        let fetch_error = |message: String| RowsetError::ChunkFetch {
            chunk_index: index,
            message,
        };

        let raw = fs::read(path)
            .map_err(|e| fetch_error(format!("cannot read '{}': {}", path.display(), e)))?;
        match self.encoding {
            ChunkEncoding::Plain => Ok(raw),
            ChunkEncoding::Zstd => zstd::stream::decode_all(raw.as_slice()).map_err(|e| {
                fetch_error(format!("cannot decompress '{}': {}", path.display(), e))
            }),
        }
    }
}

impl ChunkSource for FileChunkSource {
    fn next_chunk(&mut self) -> Result<Option<Batch>> {
        if self.recorder.is_reported() {
            return Err(RowsetError::ChunkFetch {
                chunk_index: self.next_index,
                message: "chunk source already terminated".into(),
            });
        }
        if self.next_index >= self.paths.len() {
            return Ok(None);
        }

        let started = Instant::now();
        let index = self.next_index;
        self.next_index += 1;

        let bytes = self.read_chunk(index);
        self.recorder.record_wait(started);
        let bytes = bytes?;

        let batch = self.decoder.decode(&bytes)?;
        self.recorder.record_chunk(bytes.len());
        Ok(Some(batch))
    }

    fn terminate(&mut self) -> Option<ChunkSourceMetrics> {
        self.next_index = self.paths.len();
        self.recorder.report()
    }
}
