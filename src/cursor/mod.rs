// In: src/cursor/mod.rs

//! The forward-only result cursor.
//!
//! `ResultCursor` stitches the inline batch and every chunk-source batch into a
//! single ordered row stream. It is pull-based: nothing is fetched or decoded
//! until `next()` needs the following row, and at most one decoded batch is
//! alive at any time. The previous batch is dropped, returning its buffer
//! reservation, before the next one is requested.
//!
//! Position is tracked by [`CursorPosition`]. Once a pull fails the cursor is
//! `Failed` for good and every operation re-raises the original error.

mod getters;


use std::sync::Arc;

use crate::batch::decoder::BatchDecoder;
use crate::batch::Batch;
use crate::chunk::{ChunkSource, ChunkSourceMetrics};
use crate::config::RowsetConfig;
use crate::error::{ErrorKind, Result, RowsetError};
use crate::inline::{InlineBatchProvider, InlinePayload};
use crate::memory::BufferAllocator;
use crate::telemetry::{emit_guarded, NoopTelemetry, TelemetryEvent, TelemetrySink};
use crate::types::{RowsetSchema, Value};

//==================================================================================
// I. Public Types
//==================================================================================

/// Where the cursor stands.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorPosition {
    BeforeFirst,
    /// On row `row` (zero-based) of the batch with ordinal `batch`.
    OnRow { batch: usize, row: usize },
    AfterLast,
    Failed(RowsetError),
}

impl CursorPosition {
    pub fn name(&self) -> &'static str {
        match self {
            CursorPosition::BeforeFirst => "before first row",
            CursorPosition::OnRow { .. } => "on row",
            CursorPosition::AfterLast => "after last row",
            CursorPosition::Failed(_) => "failed",
        }
    }
}

/// What the initial query response says about the result.
pub struct ResultDescriptor {
    pub inline_payload: Option<InlinePayload>,
    /// Number of chunks the server announced beyond the inline batch.
    pub total_chunk_count: usize,
    pub chunk_source: Option<Box<dyn ChunkSource>>,
}

impl ResultDescriptor {
    /// A result with no rows.
    pub fn empty() -> Self {
        Self {
            inline_payload: None,
            total_chunk_count: 0,
            chunk_source: None,
        }
    }

    /// A result delivered entirely in the initial response.
    pub fn inline(payload: InlinePayload) -> Self {
        Self {
            inline_payload: Some(payload),
            ..Self::empty()
        }
    }

    pub fn with_chunks(mut self, total_chunk_count: usize, source: Box<dyn ChunkSource>) -> Self {
        self.total_chunk_count = total_chunk_count;
        self.chunk_source = Some(source);
        self
    }
}

/// Injected collaborators and settings for one cursor.
#[derive(Clone)]
pub struct CursorOptions {
    pub config: Arc<RowsetConfig>,
    /// Accounts for the buffers of the inline batch. Chunk sources are built with
    /// their own decoder and should be given a clone of the same allocator.
    pub allocator: BufferAllocator,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            config: Arc::new(RowsetConfig::default()),
            allocator: BufferAllocator::new(),
            telemetry: Arc::new(NoopTelemetry),
        }
    }
}

impl CursorOptions {
    /// Options for `config`, with an allocator honouring its memory limit.
    pub fn from_config(config: RowsetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            allocator: BufferAllocator::from_limit(config.memory_limit_bytes),
            config: Arc::new(config),
            telemetry: Arc::new(NoopTelemetry),
        })
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }
}

//==================================================================================
// II. The Cursor
//==================================================================================

/// Which producer the next batch comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Inline,
    Source,
    /// No producer has anything left.
    Drained,
}

pub struct ResultCursor {
    options: CursorOptions,
    inline: InlineBatchProvider,
    source: Option<Box<dyn ChunkSource>>,
    total_chunk_count: usize,
    stage: Stage,
    position: CursorPosition,
    current: Option<Batch>,
    schema: Option<Arc<RowsetSchema>>,
    /// Batches handed over by either producer, empty ones included.
    batches_pulled: usize,
    chunks_pulled: usize,
    rows_yielded: u64,
    metrics: Option<ChunkSourceMetrics>,
}

impl ResultCursor {
    pub fn new(descriptor: ResultDescriptor) -> Result<Self> {
        Self::with_options(descriptor, CursorOptions::default())
    }

    /// Builds a cursor; fails with `Config` if chunks are announced but no source
    /// is given to fetch them.
    pub fn with_options(descriptor: ResultDescriptor, options: CursorOptions) -> Result<Self> {
        options.config.validate()?;
        if descriptor.total_chunk_count > 0 && descriptor.chunk_source.is_none() {
            return Err(RowsetError::Config(format!(
                "result announces {} chunks but no chunk source was provided",
                descriptor.total_chunk_count
            )));
        }

        let decoder = BatchDecoder::new(options.allocator.clone());
        let inline = InlineBatchProvider::new(descriptor.inline_payload, decoder);
        log::debug!(
            "opening result cursor (inline batch: {}, chunks: {}, memory limit: {:?})",
            !inline.is_empty(),
            descriptor.total_chunk_count,
            options.allocator.limit()
        );

        Ok(Self {
            options,
            inline,
            source: descriptor.chunk_source,
            total_chunk_count: descriptor.total_chunk_count,
            stage: Stage::Inline,
            position: CursorPosition::BeforeFirst,
            current: None,
            schema: None,
            batches_pulled: 0,
            chunks_pulled: 0,
            rows_yielded: 0,
            metrics: None,
        })
    }

    /// Advances to the next row. Returns `Ok(false)` once the result is exhausted.
    pub fn next(&mut self) -> Result<bool> {
        match self.position {
            CursorPosition::Failed(ref error) => return Err(error.clone()),
            CursorPosition::AfterLast => return Ok(false),
            CursorPosition::OnRow { batch, row } => {
                let rows_in_batch = self.current.as_ref().map_or(0, Batch::num_rows);
                if row + 1 < rows_in_batch {
                    self.position = CursorPosition::OnRow {
                        batch,
                        row: row + 1,
                    };
                    self.rows_yielded += 1;
                    return Ok(true);
                }
            }
            CursorPosition::BeforeFirst => {}
        }

        // The current batch is spent; its buffers go back before anything new is read.
        self.current = None;

        loop {
            let ordinal = self.batches_pulled;
            match self.pull_batch() {
                Ok(Some(batch)) => {
                    if batch.is_empty() {
                        log::debug!("skipping empty batch {}", ordinal);
                        continue;
                    }
                    crate::log_metric!(
                        "event" = "batch_loaded",
                        "ordinal" = ordinal,
                        "rows" = batch.num_rows(),
                        "bytes" = batch.byte_size()
                    );
                    self.current = Some(batch);
                    self.position = CursorPosition::OnRow {
                        batch: ordinal,
                        row: 0,
                    };
                    self.rows_yielded += 1;
                    return Ok(true);
                }
                Ok(None) => {
                    log::debug!(
                        "result exhausted after {} rows in {} batches",
                        self.rows_yielded,
                        self.batches_pulled
                    );
                    self.position = CursorPosition::AfterLast;
                    self.terminate_source();
                    return Ok(false);
                }
                Err(error) => return Err(self.fail(error, ordinal)),
            }
        }
    }

    /// `true` only when on the final row of the result and that is already known
    /// without fetching further.
    pub fn is_last(&self) -> bool {
        match self.position {
            CursorPosition::OnRow { row, .. } => {
                self.stage == Stage::Drained
                    && self
                        .current
                        .as_ref()
                        .is_some_and(|batch| row + 1 == batch.num_rows())
            }
            _ => false,
        }
    }

    pub fn is_after_last(&self) -> bool {
        matches!(self.position, CursorPosition::AfterLast)
    }

    pub fn is_before_first(&self) -> bool {
        matches!(self.position, CursorPosition::BeforeFirst)
    }

    /// `true` when on the first row of the whole result.
    pub fn is_first(&self) -> bool {
        matches!(self.position, CursorPosition::OnRow { .. }) && self.rows_yielded == 1
    }

    /// One-based number of the current row, or 0 when not on a row.
    pub fn row_number(&self) -> u64 {
        match self.position {
            CursorPosition::OnRow { .. } => self.rows_yielded,
            _ => 0,
        }
    }

    pub fn position(&self) -> &CursorPosition {
        &self.position
    }

    /// Ordinal of the batch holding the current row.
    pub fn batch_ordinal(&self) -> Option<usize> {
        match self.position {
            CursorPosition::OnRow { batch, .. } => Some(batch),
            _ => None,
        }
    }

    /// The result schema, known once the first batch has been decoded.
    pub fn schema(&self) -> Option<&Arc<RowsetSchema>> {
        self.schema.as_ref()
    }

    /// One-based index of the column called `name`.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.schema.as_ref()?.find(name)
    }

    /// Metrics reported by the chunk source, once it has been terminated.
    pub fn source_metrics(&self) -> Option<&ChunkSourceMetrics> {
        self.metrics.as_ref()
    }

    /// The value of column `index` (one-based) in the current row; `Ok(None)` is NULL.
    pub fn get_column(&self, index: usize) -> Result<Option<Value>> {
        if let CursorPosition::Failed(error) = &self.position {
            return Err(error.clone());
        }
        if let Some(schema) = &self.schema {
            if index == 0 || index > schema.len() {
                return Err(RowsetError::InvalidColumnIndex {
                    index,
                    column_count: schema.len(),
                });
            }
        }
        match (&self.position, &self.current) {
            (CursorPosition::OnRow { row, .. }, Some(batch)) => {
                let column = index.checked_sub(1).ok_or(RowsetError::InvalidColumnIndex {
                    index,
                    column_count: batch.schema().len(),
                })?;
                batch.value(column, *row)
            }
            (position, _) => Err(RowsetError::CursorNotPositioned {
                position: position.name(),
            }),
        }
    }

    /// Abandons the result: releases the current batch and terminates the chunk
    /// source. Returns the source's metrics. Later calls to `next()` return
    /// `false` (or re-raise the failure of a failed cursor).
    pub fn close(&mut self) -> Option<ChunkSourceMetrics> {
        self.current = None;
        self.stage = Stage::Drained;
        self.terminate_source();
        if !matches!(self.position, CursorPosition::Failed(_)) {
            self.position = CursorPosition::AfterLast;
        }
        self.metrics.clone()
    }

    //==============================================================================
    // Private Helpers
    //==============================================================================

    /// Pulls the next batch from the inline provider, then from the chunk source.
    fn pull_batch(&mut self) -> Result<Option<Batch>> {
        loop {
            match self.stage {
                Stage::Inline => {
                    let batch = self.inline.take_batch()?;
                    self.stage = if self.source.is_some() {
                        Stage::Source
                    } else {
                        Stage::Drained
                    };
                    if let Some(batch) = batch {
                        return self.accept(batch).map(Some);
                    }
                }
                Stage::Source => {
                    let Some(source) = self.source.as_mut() else {
                        self.stage = Stage::Drained;
                        continue;
                    };
                    match source.next_chunk()? {
                        Some(batch) => {
                            let batch = self.accept(batch)?;
                            self.chunks_pulled += 1;
                            return Ok(Some(batch));
                        }
                        None => {
                            self.stage = Stage::Drained;
                            self.reconcile_chunk_count();
                        }
                    }
                }
                Stage::Drained => return Ok(None),
            }
        }
    }

    /// Binds the result schema to the first batch and checks later ones against it.
    fn accept(&mut self, batch: Batch) -> Result<Batch> {
        match &self.schema {
            None => {
                log::debug!("bound result schema with {} columns", batch.schema().len());
                self.schema = Some(Arc::clone(batch.schema()));
            }
            Some(bound)
                if self.options.config.validate_schema
                    && !bound.is_compatible_with(batch.schema()) =>
            {
                return Err(RowsetError::format(
                    None,
                    None,
                    format!(
                        "batch {} has {} columns incompatible with the result schema ({} columns)",
                        self.batches_pulled,
                        batch.schema().len(),
                        bound.len()
                    ),
                ));
            }
            Some(_) => {}
        }
        self.batches_pulled += 1;
        Ok(batch)
    }

    fn reconcile_chunk_count(&self) {
        if self.chunks_pulled != self.total_chunk_count {
            log::warn!(
                "chunk source was exhausted after {} chunks but the result announced {}",
                self.chunks_pulled,
                self.total_chunk_count
            );
        }
    }

    /// Moves to `Failed`, reports the failure once and shuts the source down.
    fn fail(&mut self, error: RowsetError, ordinal: usize) -> RowsetError {
        log::error!("result cursor failed at batch {}: {}", ordinal, error);
        if matches!(error.kind(), ErrorKind::Format | ErrorKind::ChunkFetch) {
            let event = TelemetryEvent {
                kind: error.kind(),
                batch_ordinal: ordinal,
                byte_offset: error.byte_offset(),
                message: error.to_string(),
            };
            emit_guarded(self.options.telemetry.as_ref(), &event);
        }
        self.current = None;
        self.stage = Stage::Drained;
        self.terminate_source();
        self.position = CursorPosition::Failed(error.clone());
        error
    }

    /// Calls `terminate()` on the source at most once, keeping its metrics.
    fn terminate_source(&mut self) {
        if let Some(mut source) = self.source.take() {
            self.metrics = source.terminate();
        }
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        self.close();
    }
}
