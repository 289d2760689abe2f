// In: src/chunk/prefetch.rs

//! A chunk source that fetches ahead of the consumer on background workers.
//!
//! A fixed pool of worker threads pulls chunk indices from a shared job queue and
//! fetches the raw bytes through a [`ChunkFetcher`]. At most `prefetch_depth`
//! chunks are scheduled beyond the one the consumer is waiting on. Results arrive
//! in completion order and are parked in a reorder buffer until their turn, so
//! the consumer always sees strict index order. Decoding happens on the consumer
//! thread, which keeps decoded buffers to the one batch the cursor holds.
//!
//! `terminate` never waits on a fetch in progress. Workers that have already
//! exited are joined; the rest are detached and exit once their current fetch
//! returns.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::{ChunkSource, ChunkSourceMetrics, MetricsRecorder};
use crate::batch::decoder::BatchDecoder;
use crate::batch::Batch;
use crate::config::RowsetConfig;
use crate::error::{Result, RowsetError};

/// Retrieves the encoded bytes of one chunk. Implemented by the transport layer.
pub trait ChunkFetcher: Send + Sync + 'static {
    fn fetch(&self, chunk_index: usize) -> Result<Vec<u8>>;
}

impl<T> ChunkFetcher for T
where
    T: Fn(usize) -> Result<Vec<u8>> + Send + Sync + 'static,
{
    fn fetch(&self, chunk_index: usize) -> Result<Vec<u8>> {
        self(chunk_index)
    }
}

type FetchOutcome = (usize, Result<Vec<u8>>);

pub struct PrefetchingChunkSource<F: ChunkFetcher> {
    fetcher: Arc<F>,
    decoder: BatchDecoder,
    total_chunks: usize,
    depth: usize,
    next_to_return: usize,
    next_to_schedule: usize,
    job_tx: Option<Sender<usize>>,
    result_rx: Receiver<FetchOutcome>,
    pending: BTreeMap<usize, Result<Vec<u8>>>,
    /// The first error `next_chunk` returned; every later call returns it again.
    failure: Option<RowsetError>,
    cancelled: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    recorder: MetricsRecorder,
}

impl<F: ChunkFetcher> PrefetchingChunkSource<F> {
    /// Starts the worker pool and schedules the first `prefetch_depth` chunks.
    pub fn new(
        fetcher: F,
        total_chunks: usize,
        decoder: BatchDecoder,
        config: &RowsetConfig,
    ) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(fetcher);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (job_tx, job_rx) = mpsc::channel::<usize>();
        let (result_tx, result_rx) = mpsc::channel::<FetchOutcome>();
        let job_rx = Arc::new(Mutex::new(job_rx));

        let thread_count = config.prefetch_threads.min(total_chunks.max(1));
        let mut workers = Vec::with_capacity(thread_count);
        for worker_id in 0..thread_count {
            let fetcher = Arc::clone(&fetcher);
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let handle = thread::Builder::new()
                .name(format!("rowset-prefetch-{}", worker_id))
                .spawn(move || worker_loop(fetcher.as_ref(), &job_rx, &result_tx, &cancelled))
                .map_err(|e| {
                    RowsetError::InternalError(format!("cannot spawn prefetch worker: {}", e))
                })?;
            workers.push(handle);
        }
        log::debug!(
            "prefetching {} chunks with {} workers, depth {}",
            total_chunks,
            thread_count,
            config.prefetch_depth
        );

        let mut source = Self {
            fetcher,
            decoder,
            total_chunks,
            depth: config.prefetch_depth,
            next_to_return: 0,
            next_to_schedule: 0,
            job_tx: Some(job_tx),
            result_rx,
            pending: BTreeMap::new(),
            failure: None,
            cancelled,
            workers,
            recorder: MetricsRecorder::default(),
        };
        source.fill_window();
        Ok(source)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Schedules chunks until `depth` are in flight beyond the awaited one.
    fn fill_window(&mut self) {
        let Some(job_tx) = &self.job_tx else {
            return;
        };
        let horizon = (self.next_to_return + self.depth + 1).min(self.total_chunks);
        while self.next_to_schedule < horizon {
            if job_tx.send(self.next_to_schedule).is_err() {
                return;
            }
            self.next_to_schedule += 1;
        }
    }

    /// Stops scheduling and lets go of the workers without blocking on them.
    fn cancel_workers(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        // Closing the job queue wakes idle workers.
        self.job_tx.take();
        let mut detached = 0;
        for handle in self.workers.drain(..) {
            if !handle.is_finished() {
                detached += 1;
                continue;
            }
            if handle.join().is_err() {
                log::warn!("a prefetch worker panicked");
            }
        }
        if detached > 0 {
            log::debug!("detached {} prefetch workers with fetches in flight", detached);
        }
    }

    /// Blocks until the bytes of chunk `index` have arrived.
    fn await_chunk(&mut self, index: usize) -> Result<Vec<u8>> {
        loop {
            if let Some(outcome) = self.pending.remove(&index) {
                return outcome;
            }
            match self.result_rx.recv() {
                Ok((arrived, outcome)) => {
                    self.pending.insert(arrived, outcome);
                }
                Err(_) => {
                    return Err(RowsetError::ChunkFetch {
                        chunk_index: index,
                        message: "prefetch workers exited before delivering the chunk".into(),
                    })
                }
            }
        }
    }
}

impl<F: ChunkFetcher> ChunkSource for PrefetchingChunkSource<F> {
    fn next_chunk(&mut self) -> Result<Option<Batch>> {
        if self.recorder.is_reported() {
            return Err(RowsetError::ChunkFetch {
                chunk_index: self.next_to_return,
                message: "chunk source already terminated".into(),
            });
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if self.next_to_return >= self.total_chunks {
            return Ok(None);
        }

        let index = self.next_to_return;
        self.fill_window();
        let started = Instant::now();
        let bytes = self.await_chunk(index);
        self.recorder.record_wait(started);

        let decoded = bytes.and_then(|bytes| {
            self.next_to_return += 1;
            self.fill_window();
            let batch = self.decoder.decode(&bytes)?;
            self.recorder.record_chunk(bytes.len());
            Ok(batch)
        });
        match decoded {
            Ok(batch) => Ok(Some(batch)),
            Err(error) => {
                // Nothing after a failed chunk is served.
                self.cancel_workers();
                self.failure = Some(error.clone());
                Err(error)
            }
        }
    }

    fn terminate(&mut self) -> Option<ChunkSourceMetrics> {
        if self.recorder.is_reported() {
            return None;
        }
        self.cancel_workers();
        let discarded = self.pending.len() + self.result_rx.try_iter().count();
        self.pending.clear();
        if discarded > 0 {
            log::debug!("discarded {} prefetched chunks on terminate", discarded);
        }
        self.recorder.report()
    }
}

impl<F: ChunkFetcher> Drop for PrefetchingChunkSource<F> {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn worker_loop<F: ChunkFetcher>(
    fetcher: &F,
    job_rx: &Mutex<Receiver<usize>>,
    result_tx: &Sender<FetchOutcome>,
    cancelled: &AtomicBool,
) {
    loop {
        let job = match job_rx.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => return,
        };
        let Ok(index) = job else {
            return;
        };
        if cancelled.load(Ordering::Acquire) {
            return;
        }
        let outcome = fetcher.fetch(index);
        if result_tx.send((index, outcome)).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::encode_int_rows;
    use crate::types::Value;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn config(threads: usize, depth: usize) -> RowsetConfig {
        RowsetConfig {
            prefetch_threads: threads,
            prefetch_depth: depth,
            ..RowsetConfig::default()
        }
    }

    #[test]
    fn test_delivers_in_index_order_despite_uneven_latency() {
        // 1. Arrange: early chunks are the slowest to fetch.
        let fetcher = |index: usize| -> Result<Vec<u8>> {
            thread::sleep(Duration::from_millis(((8 - index) % 4) as u64 * 5));
            Ok(encode_int_rows(&[vec![index as i32]], 1))
        };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 8, BatchDecoder::default(), &config(4, 3))
                .unwrap();

        // 2. Act
        let mut seen = Vec::new();
        while let Some(batch) = source.next_chunk().unwrap() {
            seen.push(batch.value(0, 0).unwrap());
        }

        // 3. Assert
        let expected: Vec<_> = (0..8).map(|i| Some(Value::Integer(i))).collect();
        assert_eq!(seen, expected);
        let metrics = source.terminate().unwrap();
        assert_eq!(metrics.chunks_served, 8);
        assert_eq!(source.terminate(), None);
    }

    #[test]
    fn test_fetch_error_surfaces_at_its_position() {
        let fetcher = |index: usize| -> Result<Vec<u8>> {
            if index == 2 {
                return Err(RowsetError::ChunkFetch {
                    chunk_index: index,
                    message: "HTTP 503".into(),
                });
            }
            Ok(encode_int_rows(&[vec![index as i32]], 1))
        };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 5, BatchDecoder::default(), &config(2, 2))
                .unwrap();

        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_some());
        assert!(matches!(
            source.next_chunk(),
            Err(RowsetError::ChunkFetch { chunk_index: 2, .. })
        ));
    }

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl ChunkFetcher for CountingFetcher {
        fn fetch(&self, chunk_index: usize) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            Ok(encode_int_rows(&[vec![chunk_index as i32]], 1))
        }
    }

    #[test]
    fn test_terminate_cancels_outstanding_work() {
        let fetcher = CountingFetcher {
            calls: AtomicUsize::new(0),
        };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 100, BatchDecoder::default(), &config(2, 2))
                .unwrap();

        assert!(source.next_chunk().unwrap().is_some());
        let metrics = source.terminate().unwrap();

        assert_eq!(metrics.chunks_served, 1);
        // One consumed chunk plus at most a full window behind it.
        assert!(source.fetcher().calls.load(Ordering::SeqCst) <= 4);
        assert!(matches!(
            source.next_chunk(),
            Err(RowsetError::ChunkFetch { .. })
        ));
    }

    #[test]
    fn test_terminate_does_not_wait_for_a_slow_fetch() {
        // Every chunk after the first takes far longer than terminate may.
        let fetcher = |index: usize| -> Result<Vec<u8>> {
            if index > 0 {
                thread::sleep(Duration::from_secs(3));
            }
            Ok(encode_int_rows(&[vec![index as i32]], 1))
        };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 10, BatchDecoder::default(), &config(2, 2))
                .unwrap();
        assert!(source.next_chunk().unwrap().is_some());

        let started = Instant::now();
        let metrics = source.terminate().unwrap();
        drop(source);

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(metrics.chunks_served, 1);
    }

    #[test]
    fn test_failure_is_returned_again_without_blocking() {
        let fetcher = |index: usize| -> Result<Vec<u8>> {
            if index == 1 {
                return Err(RowsetError::ChunkFetch {
                    chunk_index: index,
                    message: "connection reset".into(),
                });
            }
            Ok(encode_int_rows(&[vec![index as i32]], 1))
        };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 6, BatchDecoder::default(), &config(2, 2))
                .unwrap();

        assert!(source.next_chunk().unwrap().is_some());
        let first = source.next_chunk().unwrap_err();
        let second = source.next_chunk().unwrap_err();

        assert!(matches!(first, RowsetError::ChunkFetch { chunk_index: 1, .. }));
        assert_eq!(second, first);
        assert_eq!(source.terminate().unwrap().chunks_served, 1);
    }

    #[test]
    fn test_zero_chunks_is_immediately_exhausted() {
        let fetcher = |_: usize| -> Result<Vec<u8>> { Ok(Vec::new()) };
        let mut source =
            PrefetchingChunkSource::new(fetcher, 0, BatchDecoder::default(), &config(4, 2))
                .unwrap();
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let fetcher = |_: usize| -> Result<Vec<u8>> { Ok(Vec::new()) };
        let result = PrefetchingChunkSource::new(fetcher, 3, BatchDecoder::default(), &config(0, 2));
        assert!(matches!(result, Err(RowsetError::Config(_))));
    }
}
